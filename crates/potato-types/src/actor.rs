use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of a participant that can create or hold a potato.
///
/// The core never interprets the contents: it may be a social handle, a
/// numeric user id, or a wallet address. The only structural rule is that it
/// is non-empty after trimming whitespace. The value itself is kept verbatim.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    /// Create an actor id, rejecting empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::EmptyActor);
        }
        Ok(Self(id))
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ActorId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActorId> for String {
    fn from(actor: ActorId) -> Self {
        actor.0
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ActorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ActorId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ActorId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
