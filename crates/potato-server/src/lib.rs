//! HTTP server for the hot potato custody ledger.
//!
//! A thin JSON surface over [`potato_custody::OwnershipService`]. Frame
//! handlers, dashboards, and other callers talk to this; all custody rules
//! live in the service.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{ResolverConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, DynOwnershipService};
pub use server::PotatoServer;
