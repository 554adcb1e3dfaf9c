//! Chain storage for the hot potato custody ledger.
//!
//! The store holds the complete collection of [`Potato`] records and exposes
//! whole-collection load/replace semantics. Write volume is low and the
//! system runs on a single node, so one document per collection is enough;
//! what matters is that a reader never observes a half-written collection.
//!
//! # Storage Backends
//!
//! All backends implement the [`ChainStore`] trait:
//!
//! - [`InMemoryChainStore`] -- `RwLock<Vec<Potato>>` for tests and embedding
//! - [`JsonFileChainStore`] -- pretty JSON document replaced via temp file + rename
//!
//! # Design Rules
//!
//! 1. `load` on a store with no backing state returns an empty collection.
//! 2. `save` replaces the entire collection atomically.
//! 3. Unparseable persisted data is reported as [`StoreError::Corrupt`] and is
//!    never silently discarded or overwritten.
//! 4. All I/O errors are propagated, never silently ignored.
//!
//! [`Potato`]: potato_types::Potato

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileChainStore;
pub use memory::InMemoryChainStore;
pub use traits::ChainStore;
