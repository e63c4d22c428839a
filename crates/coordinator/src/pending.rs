//! Pending-action bookkeeping
//!
//! One mutation at a time may sit in the undoable slot. The slot is a
//! three-state machine:
//!
//! ```text
//! Idle --submit--> Pending --cancel--> Idle (rollback applied)
//!                     |
//!                     +--finalize begins--> Finalizing --resolved--> Idle
//! ```
//!
//! Moving the action out of the slot (Pending → Finalizing) happens under
//! the slot lock and *is* the finalize guard: whichever of the
//! timer-expiry path, `force_commit_now`, or a displacing `submit_*`
//! takes the action, every other path finds the slot empty and backs off.

use greenroom_core::{EntityId, EventDraft, EventRecord};
use std::fmt;

/// Which mutation a pending action will perform at finalize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// A create: the store holds a provisional entity
    Create,
    /// An update: the store holds the optimistically overwritten entity
    Update,
    /// A delete: the entity is optimistically gone from the store
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Create => write!(f, "create"),
            MutationKind::Update => write!(f, "update"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

/// An optimistic mutation awaiting its grace-period expiry
///
/// Each variant carries exactly what rollback needs: the snapshot taken
/// before the optimistic change (Update, Delete — including the vacated
/// position for Delete), or nothing for Create, where rollback is the
/// removal of the provisional entity.
#[derive(Debug, Clone)]
pub enum PendingAction {
    /// Pending create; the provisional entity is already in the store
    Create {
        /// Locally generated id of the optimistic entity
        provisional_id: EntityId,
        /// Payload to send at finalize
        draft: EventDraft,
    },
    /// Pending update; the store shows the draft applied
    Update {
        /// Target record id
        id: EntityId,
        /// Payload to send at finalize
        draft: EventDraft,
        /// Entity state before the optimistic overwrite
        original: EventRecord,
    },
    /// Pending delete; the entity is removed from the store
    Delete {
        /// Target record id
        id: EntityId,
        /// Entity state before removal
        original: EventRecord,
        /// Position the entity was removed from, for exact restore
        index: usize,
    },
}

impl PendingAction {
    /// The mutation this action performs
    pub fn kind(&self) -> MutationKind {
        match self {
            PendingAction::Create { .. } => MutationKind::Create,
            PendingAction::Update { .. } => MutationKind::Update,
            PendingAction::Delete { .. } => MutationKind::Delete,
        }
    }

    /// Id of the record the action targets
    pub fn target(&self) -> EntityId {
        match self {
            PendingAction::Create { provisional_id, .. } => *provisional_id,
            PendingAction::Update { id, .. } => *id,
            PendingAction::Delete { id, .. } => *id,
        }
    }
}

/// UI-facing descriptor of the undoable action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMutation {
    /// Which mutation is pending
    pub kind: MutationKind,
    /// Id of the targeted record
    pub target: EntityId,
    /// Whole seconds left in the grace period
    pub remaining_secs: u64,
}

/// The undoable slot
///
/// `seq` is the action's unique sequence number; the timer-expiry
/// callback carries the sequence it was armed for, so an expiry for a
/// superseded action cannot touch a newer one.
pub(crate) enum Slot {
    Idle,
    Pending { seq: u64, action: PendingAction },
    Finalizing { seq: u64 },
}
