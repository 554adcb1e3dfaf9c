use std::collections::HashSet;

use potato_types::{Potato, PotatoId};
use serde::Serialize;

/// Result of auditing a potato collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub potato_count: usize,
    pub handoff_count: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    /// Returns `true` if every record satisfies the custody invariants.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific invariant violation found in a stored record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub potato_id: PotatoId,
    /// Chain index the violation was found at, when it applies to one.
    pub position: Option<usize>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    EmptyChain,
    CreatorMismatch,
    HolderMismatch,
    SelfTransfer,
    ImmediateReturn,
    DuplicateId,
}

impl ViolationKind {
    /// Returns `true` for violations that break the chain endpoints the
    /// transfer rules read from (`chain[0]`, `chain[last]`, `chain[len-2]`).
    /// A record with one of these cannot be safely extended.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::EmptyChain | Self::CreatorMismatch | Self::HolderMismatch
        )
    }
}

/// Read-only invariant checker over a stored collection.
///
/// Records produced by the ownership service always pass. The auditor exists
/// for documents that were edited by hand or written by older tooling; it
/// reports problems and never repairs them.
pub struct ChainAuditor;

impl ChainAuditor {
    pub fn audit(potatoes: &[Potato]) -> AuditReport {
        let mut violations = Vec::new();
        let mut seen_ids = HashSet::new();

        for potato in potatoes {
            let id = *potato.id();
            if !seen_ids.insert(id) {
                violations.push(Violation {
                    potato_id: id,
                    position: None,
                    kind: ViolationKind::DuplicateId,
                    description: "potato id appears more than once".into(),
                });
            }
            violations.extend(Self::audit_record(potato));
        }

        AuditReport {
            potato_count: potatoes.len(),
            handoff_count: potatoes.iter().map(Potato::handoff_count).sum(),
            violations,
        }
    }

    /// Check one record in isolation. Duplicate ids need the whole
    /// collection and are only reported by [`ChainAuditor::audit`].
    pub fn audit_record(potato: &Potato) -> Vec<Violation> {
        let id = *potato.id();
        let mut violations = Vec::new();

        let chain = potato.chain();
        let (Some(first), Some(last)) = (chain.first(), chain.last()) else {
            violations.push(Violation {
                potato_id: id,
                position: None,
                kind: ViolationKind::EmptyChain,
                description: "custody chain is empty".into(),
            });
            return violations;
        };

        if first != potato.creator() {
            violations.push(Violation {
                potato_id: id,
                position: Some(0),
                kind: ViolationKind::CreatorMismatch,
                description: format!(
                    "chain starts with {first} but creator is {}",
                    potato.creator()
                ),
            });
        }

        if last != potato.current_holder() {
            violations.push(Violation {
                potato_id: id,
                position: Some(chain.len() - 1),
                kind: ViolationKind::HolderMismatch,
                description: format!(
                    "chain ends with {last} but current holder is {}",
                    potato.current_holder()
                ),
            });
        }

        for (i, pair) in chain.windows(2).enumerate() {
            if pair[0] == pair[1] {
                violations.push(Violation {
                    potato_id: id,
                    position: Some(i + 1),
                    kind: ViolationKind::SelfTransfer,
                    description: format!("{} passed the potato to themselves", pair[0]),
                });
            }
        }

        for (i, triple) in chain.windows(3).enumerate() {
            if triple[0] == triple[2] && triple[0] != triple[1] {
                violations.push(Violation {
                    potato_id: id,
                    position: Some(i + 2),
                    kind: ViolationKind::ImmediateReturn,
                    description: format!(
                        "{} sent the potato straight back to {}",
                        triple[1], triple[2]
                    ),
                });
            }
        }

        violations
    }
}
