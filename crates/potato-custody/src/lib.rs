//! Custody protocol for the hot potato ledger.
//!
//! This crate is the heart of the system. It provides:
//! - [`TransferValidator`]: pure accept/reject decisions for a proposed handoff
//! - [`ReceiverResolver`]: the injected capability that maps a receiver
//!   handle to a canonical actor address
//! - [`OwnershipService`]: the only mutation entry point (create, transfer)
//!   plus read-only queries, serialized behind a single commit lock
//! - [`ChainAuditor`]: read-only invariant checks over a stored collection

pub mod audit;
pub mod error;
pub mod resolver;
pub mod service;
pub mod validator;

pub use audit::{AuditReport, ChainAuditor, Violation, ViolationKind};
pub use error::{CustodyError, CustodyResult};
pub use resolver::{
    DirectoryResolver, PassthroughResolver, ReceiverResolver, ResolveError, Resolution,
};
pub use service::{ActorPotatoes, OwnershipService};
pub use validator::{Approval, Rejection, TransferRequest, TransferValidator};
