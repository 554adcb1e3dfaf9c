use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::error::TypeError;

/// Unique identifier for a potato (random UUID v4).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PotatoId(uuid::Uuid);

impl PotatoId {
    /// Generate a fresh random potato id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for PotatoId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for PotatoId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| TypeError::InvalidPotatoId {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Debug for PotatoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PotatoId({})", self.short_id())
    }
}

impl fmt::Display for PotatoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical lifecycle state of a potato.
///
/// Neither state is terminal: a potato can be passed on indefinitely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustodyState {
    /// Freshly created; the creator still holds it and the chain has one entry.
    Created,
    /// Handed off at least once.
    InCirculation,
}

impl fmt::Display for CustodyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::InCirculation => write!(f, "InCirculation"),
        }
    }
}

/// A potato and its complete custody history.
///
/// Invariants maintained by the methods on this type:
/// - `chain[0] == creator`
/// - `chain[last] == current_holder`
/// - `chain` only ever grows, by one entry per handoff.
///
/// Transfer legality (no self-transfer, no immediate return) is enforced by
/// the custody layer before [`Potato::record_handoff`] is called.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Potato {
    id: PotatoId,
    creator: ActorId,
    current_holder: ActorId,
    created_at: DateTime<Utc>,
    chain: Vec<ActorId>,
    /// Externally computed score supplied at creation. Stored, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<u64>,
}

impl Potato {
    /// Create a new potato held by its creator, stamped with the current time.
    pub fn new(creator: ActorId, score: Option<u64>) -> Self {
        Self::with_id(PotatoId::new(), creator, Utc::now(), score)
    }

    /// Create a new potato with an explicit id and creation time.
    pub fn with_id(
        id: PotatoId,
        creator: ActorId,
        created_at: DateTime<Utc>,
        score: Option<u64>,
    ) -> Self {
        Self {
            id,
            current_holder: creator.clone(),
            chain: vec![creator.clone()],
            creator,
            created_at,
            score,
        }
    }

    pub fn id(&self) -> &PotatoId {
        &self.id
    }

    pub fn creator(&self) -> &ActorId {
        &self.creator
    }

    pub fn current_holder(&self) -> &ActorId {
        &self.current_holder
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Custody history, oldest first.
    pub fn chain(&self) -> &[ActorId] {
        &self.chain
    }

    pub fn score(&self) -> Option<u64> {
        self.score
    }

    /// The actor who handed the potato to the current holder, if any.
    pub fn previous_holder(&self) -> Option<&ActorId> {
        self.chain
            .len()
            .checked_sub(2)
            .and_then(|index| self.chain.get(index))
    }

    /// Number of successful handoffs so far.
    pub fn handoff_count(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }

    pub fn state(&self) -> CustodyState {
        if self.chain.len() >= 2 {
            CustodyState::InCirculation
        } else {
            CustodyState::Created
        }
    }

    /// Returns `true` if `actor` created this potato.
    pub fn is_created_by(&self, actor: &str) -> bool {
        self.creator == *actor
    }

    /// Returns `true` if `actor` currently holds this potato.
    pub fn is_held_by(&self, actor: &str) -> bool {
        self.current_holder == *actor
    }

    /// Append `receiver` to the chain and make it the current holder.
    ///
    /// This does not check transfer legality; callers must have obtained an
    /// approval from the transfer validator first.
    pub fn record_handoff(&mut self, receiver: ActorId) {
        self.chain.push(receiver.clone());
        self.current_holder = receiver;
    }
}
