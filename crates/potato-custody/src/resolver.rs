//! Receiver resolution.
//!
//! Transfers name their receiver by handle; the chain records canonical
//! actor addresses. Mapping one to the other belongs to an external
//! collaborator (a social-graph lookup, a directory service), injected into
//! the ownership service as a [`ReceiverResolver`]. Latency and timeouts are
//! the resolver's concern. The custody layer only sees the outcome and fails
//! closed on anything other than a resolved address.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use potato_types::{ActorId, TypeError};

/// Failure talking to the resolution backend.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("resolver transport failure: {0}")]
    Transport(String),

    #[error("resolver timed out after {0:?}")]
    Timeout(Duration),
}

/// Maps a receiver handle to a canonical actor address.
pub trait ReceiverResolver: Send + Sync {
    /// Returns `Ok(None)` when the handle is unknown.
    fn resolve(&self, handle: &str) -> Result<Option<ActorId>, ResolveError>;
}

impl<T: ReceiverResolver + ?Sized> ReceiverResolver for Box<T> {
    fn resolve(&self, handle: &str) -> Result<Option<ActorId>, ResolveError> {
        (**self).resolve(handle)
    }
}

impl<T: ReceiverResolver + ?Sized> ReceiverResolver for Arc<T> {
    fn resolve(&self, handle: &str) -> Result<Option<ActorId>, ResolveError> {
        (**self).resolve(handle)
    }
}

/// Outcome of resolving a receiver, as consumed by the transfer validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ActorId),
    Unresolved { reason: String },
}

impl Resolution {
    /// Run `resolver` on `handle`, folding "not found" and transport errors
    /// into `Unresolved`.
    pub fn resolve_with<R: ReceiverResolver + ?Sized>(resolver: &R, handle: &str) -> Self {
        match resolver.resolve(handle) {
            Ok(Some(address)) => Self::Resolved(address),
            Ok(None) => Self::Unresolved {
                reason: "no actor matches this handle".into(),
            },
            Err(e) => Self::Unresolved {
                reason: e.to_string(),
            },
        }
    }

    /// The resolved address, if resolution succeeded.
    pub fn address(&self) -> Option<&ActorId> {
        match self {
            Self::Resolved(address) => Some(address),
            Self::Unresolved { .. } => None,
        }
    }
}

/// Treats every non-empty handle as its own canonical address.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughResolver;

impl ReceiverResolver for PassthroughResolver {
    fn resolve(&self, handle: &str) -> Result<Option<ActorId>, ResolveError> {
        Ok(ActorId::new(handle).ok())
    }
}

/// Fixed handle -> address table.
///
/// Lookups ignore surrounding whitespace and a leading `@`. Handles missing
/// from the table are unresolved unless `allow_unlisted` is set, in which case
/// they pass through unchanged (useful when callers already send addresses).
#[derive(Clone, Debug, Default)]
pub struct DirectoryResolver {
    entries: HashMap<String, ActorId>,
    allow_unlisted: bool,
}

impl DirectoryResolver {
    /// Build a directory from `(handle, address)` pairs.
    pub fn new<I, H, A>(entries: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = (H, A)>,
        H: AsRef<str>,
        A: Into<String>,
    {
        let mut table = HashMap::new();
        for (handle, address) in entries {
            table.insert(normalize(handle.as_ref()).to_string(), ActorId::new(address)?);
        }
        Ok(Self {
            entries: table,
            allow_unlisted: false,
        })
    }

    /// Let handles missing from the table resolve to themselves.
    pub fn allow_unlisted(mut self, allow: bool) -> Self {
        self.allow_unlisted = allow;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReceiverResolver for DirectoryResolver {
    fn resolve(&self, handle: &str) -> Result<Option<ActorId>, ResolveError> {
        if let Some(address) = self.entries.get(normalize(handle)) {
            return Ok(Some(address.clone()));
        }
        if self.allow_unlisted {
            return Ok(ActorId::new(handle).ok());
        }
        Ok(None)
    }
}

fn normalize(handle: &str) -> &str {
    let handle = handle.trim();
    handle.strip_prefix('@').unwrap_or(handle)
}
