//! Mutation outcome reporting.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a registry mutation left state unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Slot is owned by another module.
    OwnershipConflict {
        slot: String,
        owner: String,
        requested: String,
    },
    SlotNotFound(String),
    AlreadyAttached {
        slot: String,
        instance_id: String,
    },
    NotAttached {
        slot: String,
        instance_id: String,
    },
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OwnershipConflict {
                slot,
                owner,
                requested,
            } => write!(
                f,
                "extension slot `{slot}` already registered with module `{owner}`; refusing to register from `{requested}`"
            ),
            Self::SlotNotFound(slot) => write!(f, "extension slot `{slot}` does not exist"),
            Self::AlreadyAttached { slot, instance_id } => {
                write!(f, "extension slot `{slot}` already has `{instance_id}`")
            }
            Self::NotAttached { slot, instance_id } => {
                write!(f, "extension slot `{slot}` does not have `{instance_id}`")
            }
        }
    }
}

impl Error for RejectReason {}

/// Result of one registry mutation.
///
/// Rejections are soft: they are logged and keep prior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    Rejected(RejectReason),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn rejection(&self) -> Option<&RejectReason> {
        match self {
            Self::Applied => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}
