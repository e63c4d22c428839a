//! Optimistic mutation coordination for Greenroom
//!
//! The pieces of the undo flow:
//! - [`ActionTimer`]: 1 Hz grace-period countdown driven by an absolute
//!   deadline, with race-free cancellation.
//! - [`PendingAction`]: the one outstanding undoable mutation, with the
//!   snapshot needed to reverse it.
//! - [`MutationCoordinator`]: applies mutations optimistically, runs the
//!   grace period, and finalizes or rolls back — reconciling the store
//!   with server truth on every outcome.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod pending;
pub mod timer;

pub use coordinator::{CoordinatorConfig, MutationCoordinator, Notice, DEFAULT_GRACE};
pub use pending::{MutationKind, PendingAction, PendingMutation};
pub use timer::ActionTimer;
