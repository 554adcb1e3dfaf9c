use potato_types::{ActorId, Potato, PotatoId};

use crate::resolver::Resolution;

/// A proposed handoff, as seen by the validator.
#[derive(Clone, Copy, Debug)]
pub struct TransferRequest<'a> {
    pub potato_id: &'a PotatoId,
    /// Actor claiming to hold the potato.
    pub sender: &'a str,
    /// Receiver handle exactly as the caller supplied it.
    pub receiver: &'a str,
    /// Outcome of resolving `receiver` to a canonical address.
    pub resolution: &'a Resolution,
}

/// Why a transfer was refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("potato not found: {potato_id}")]
    NotFound { potato_id: String },

    #[error("{sender} does not hold this potato (current holder: {holder})")]
    NotHolder { sender: String, holder: String },

    #[error("cannot send potato to yourself ({actor})")]
    SelfTransfer { actor: String },

    #[error("receiver {handle:?} could not be resolved: {reason}")]
    UnresolvedReceiver { handle: String, reason: String },

    #[error("cannot send potato back to {receiver}, who just passed it to you")]
    ImmediateReturn { receiver: String },
}

impl Rejection {
    /// Stable snake_case reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotHolder { .. } => "not_holder",
            Self::SelfTransfer { .. } => "self_transfer",
            Self::UnresolvedReceiver { .. } => "unresolved_receiver",
            Self::ImmediateReturn { .. } => "immediate_return",
        }
    }
}

/// Proof that a transfer passed validation against a specific collection.
///
/// Only the validator can construct one. It carries the record's position
/// in the collection it was validated against and the canonical receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Approval {
    position: usize,
    receiver: ActorId,
}

impl Approval {
    /// Index of the approved record in the validated collection.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Canonical address of the new holder.
    pub fn receiver(&self) -> &ActorId {
        &self.receiver
    }

    pub fn into_receiver(self) -> ActorId {
        self.receiver
    }
}

/// Pure transfer-legality check. Never mutates anything.
///
/// Rules are evaluated in order and the first failure wins:
/// 1. the potato exists
/// 2. the sender is the current holder
/// 3. the sender is not also the receiver (by handle or resolved address)
/// 4. the receiver handle resolved to an address
/// 5. the receiver is not the previous holder (`chain[len-2]`)
///
/// Rule 5 looks exactly one step back. Longer cycles such as A -> B -> C -> A
/// are allowed.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransferValidator;

impl TransferValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `request` against the full collection.
    pub fn validate(
        &self,
        potatoes: &[Potato],
        request: &TransferRequest<'_>,
    ) -> Result<Approval, Rejection> {
        let Some(position) = potatoes.iter().position(|p| p.id() == request.potato_id) else {
            return Err(Rejection::NotFound {
                potato_id: request.potato_id.to_string(),
            });
        };
        let potato = &potatoes[position];

        if !potato.is_held_by(request.sender) {
            return Err(Rejection::NotHolder {
                sender: request.sender.to_string(),
                holder: potato.current_holder().to_string(),
            });
        }

        let resolves_to_sender = request
            .resolution
            .address()
            .is_some_and(|address| *address == *request.sender);
        if request.sender == request.receiver || resolves_to_sender {
            return Err(Rejection::SelfTransfer {
                actor: request.sender.to_string(),
            });
        }

        let receiver = match request.resolution {
            Resolution::Resolved(address) => address,
            Resolution::Unresolved { reason } => {
                return Err(Rejection::UnresolvedReceiver {
                    handle: request.receiver.to_string(),
                    reason: reason.clone(),
                });
            }
        };

        if potato.previous_holder() == Some(receiver) {
            return Err(Rejection::ImmediateReturn {
                receiver: receiver.to_string(),
            });
        }

        Ok(Approval {
            position,
            receiver: receiver.clone(),
        })
    }
}
