//! Foundation types for the hot potato custody ledger.
//!
//! A potato is a token created by one actor and handed from actor to actor.
//! Every handoff is recorded in an append-only custody chain. This crate holds
//! the identity and record types shared by every other crate.
//!
//! # Key Types
//!
//! - [`ActorId`] -- Opaque, non-empty identifier of a participant
//! - [`PotatoId`] -- UUID v4 potato identifier
//! - [`Potato`] -- The custody record (creator, holder, chain)
//! - [`CustodyState`] -- `Created` or `InCirculation`

pub mod actor;
pub mod error;
pub mod potato;

pub use actor::ActorId;
pub use error::TypeError;
pub use potato::{CustodyState, Potato, PotatoId};
