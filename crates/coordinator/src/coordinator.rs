//! Mutation coordinator
//!
//! Owns the optimistic create/update/delete flow: apply to the store
//! immediately, hold the mutation in the undoable slot for the grace
//! period, then finalize through the gated client — or roll back exactly
//! if the user cancels in time.
//!
//! One coordinator instance is created per session and owns all of its
//! state; there are no module-level singletons. At most one action is
//! undoable at a time: submitting a new mutation force-finalizes the
//! previous one before the new optimistic change is applied, which also
//! preserves causal order when consecutive mutations target the same
//! record.

use crate::pending::{MutationKind, PendingAction, PendingMutation, Slot};
use crate::timer::ActionTimer;
use greenroom_core::{
    EntityId, Error, EventDraft, EventRecord, ProvisionalIdGen, ResourceApi, Result,
};
use greenroom_store::ResourceStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Default grace period before a mutation is committed
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Tuning knobs for [`MutationCoordinator`]
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long a mutation stays undoable before auto-commit
    pub grace: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            grace: DEFAULT_GRACE,
        }
    }
}

/// Out-of-band events surfaced to the UI boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A finalize failed; the store was reloaded from the server
    CommitFailed {
        /// Which mutation failed
        kind: MutationKind,
        /// Record the mutation targeted
        target: EntityId,
        /// The failure
        error: Error,
    },
    /// A full reload failed; the store may lag server truth
    ReloadFailed {
        /// The failure
        error: Error,
    },
    /// The session cannot be renewed; the application should terminate it
    SessionFatal {
        /// Description of the fatal failure
        message: String,
    },
}

/// Orchestrates optimistic mutations, the undo grace period, and
/// finalization against the resource API
///
/// Cloning is cheap and shares the same coordinator state. All `submit_*`
/// operations are purely local, return immediately, and cannot fail; they
/// must be called from within a Tokio runtime (the grace countdown and
/// displaced finalizations run as tasks).
#[derive(Clone)]
pub struct MutationCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn ResourceApi>,
    store: ResourceStore,
    timer: ActionTimer,
    slot: Mutex<Slot>,
    next_seq: AtomicU64,
    ids: ProvisionalIdGen,
    grace: Duration,
    notices: mpsc::UnboundedSender<Notice>,
}

impl MutationCoordinator {
    /// Create a coordinator over the given (gated) resource API
    ///
    /// Returns the coordinator and the receiving end of the notice
    /// channel.
    pub fn new(
        api: Arc<dyn ResourceApi>,
        config: CoordinatorConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            inner: Arc::new(Inner {
                api,
                store: ResourceStore::new(),
                timer: ActionTimer::new(),
                slot: Mutex::new(Slot::Idle),
                next_seq: AtomicU64::new(0),
                ids: ProvisionalIdGen::new(),
                grace: config.grace,
                notices,
            }),
        };
        (coordinator, rx)
    }

    /// Current store contents in display order
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.inner.store.snapshot()
    }

    /// Look up a single record
    pub fn get(&self, id: EntityId) -> Option<EventRecord> {
        self.inner.store.get(id)
    }

    /// Descriptor of the undoable action, if one is pending
    pub fn pending(&self) -> Option<PendingMutation> {
        let slot = self.inner.slot.lock();
        match &*slot {
            Slot::Pending { action, .. } => Some(PendingMutation {
                kind: action.kind(),
                target: action.target(),
                remaining_secs: self.inner.timer.remaining_secs(),
            }),
            _ => None,
        }
    }

    /// Optimistically create a record; returns its provisional id
    pub fn submit_create(&self, draft: EventDraft) -> EntityId {
        self.force_finalize_pending();
        let id = self.inner.ids.next_id();
        self.inner
            .store
            .insert(EventRecord::provisional(id, &draft));
        self.register(PendingAction::Create {
            provisional_id: id,
            draft,
        });
        id
    }

    /// Optimistically overwrite the record identified by `id`
    ///
    /// Ignored (with a warning) when the id is unknown — including the
    /// case where the record was just optimistically deleted and that
    /// delete got force-finalized by this call.
    pub fn submit_update(&self, id: EntityId, draft: EventDraft) {
        self.force_finalize_pending();
        let Some(original) = self.inner.store.get(id) else {
            warn!(target: "greenroom::undo", %id, "update ignored: unknown id");
            return;
        };
        self.inner.store.replace(id, draft.apply_to(&original));
        self.register(PendingAction::Update {
            id,
            draft,
            original,
        });
    }

    /// Optimistically delete the record identified by `id`
    pub fn submit_delete(&self, id: EntityId) {
        self.force_finalize_pending();
        let Some((index, original)) = self.inner.store.remove(id) else {
            warn!(target: "greenroom::undo", %id, "delete ignored: unknown id");
            return;
        };
        self.register(PendingAction::Delete {
            id,
            original,
            index,
        });
    }

    /// Undo the pending mutation, restoring the store entity-for-entity
    ///
    /// No-op when nothing is pending or finalization has already begun.
    pub fn cancel_pending(&self) {
        let inner = &self.inner;
        let action = {
            let mut slot = inner.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Idle) {
                Slot::Pending { action, .. } => action,
                other => {
                    *slot = other;
                    return;
                }
            }
        };
        inner.timer.cancel();
        match action {
            PendingAction::Create { provisional_id, .. } => {
                inner.store.remove(provisional_id);
            }
            PendingAction::Update { id, original, .. } => {
                inner.store.replace(id, original);
            }
            PendingAction::Delete {
                original, index, ..
            } => {
                inner.store.insert_at(index, original);
            }
        }
        debug!(target: "greenroom::undo", "pending action cancelled and rolled back");
    }

    /// Commit the pending mutation now instead of waiting out the grace
    /// period; awaits the network outcome. No-op when nothing is pending.
    pub async fn force_commit_now(&self) {
        let Some((seq, action)) = self.inner.take_pending() else {
            return;
        };
        self.inner.timer.cancel();
        self.inner.commit(action, seq).await;
    }

    /// Fetch the full collection and replace the store with it
    ///
    /// Returns `Ok(false)` without touching the store when a mutation is
    /// pending — the optimistic view wins until the action resolves.
    pub async fn reload(&self) -> Result<bool> {
        self.inner.fetch_and_apply().await
    }

    /// Register a freshly applied optimistic mutation and arm the timer
    fn register(&self, action: PendingAction) {
        let inner = &self.inner;
        let seq = inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            target: "greenroom::undo",
            seq,
            kind = %action.kind(),
            record = %action.target(),
            grace_secs = inner.grace.as_secs(),
            "grace period started"
        );
        *inner.slot.lock() = Slot::Pending { seq, action };
        let weak = Arc::downgrade(inner);
        inner.timer.start(inner.grace, move || {
            // The coordinator may already be gone when the countdown
            // expires; an orphaned expiry is a no-op.
            if let Some(inner) = weak.upgrade() {
                tokio::spawn(async move { inner.finalize_expired(seq).await });
            }
        });
    }

    /// Dispatch the pending action's finalization without waiting for it
    ///
    /// Used when a new `submit_*` displaces the current action: the
    /// network call is triggered immediately and runs detached.
    fn force_finalize_pending(&self) {
        let Some((seq, action)) = self.inner.take_pending() else {
            return;
        };
        self.inner.timer.cancel();
        debug!(target: "greenroom::undo", seq, "force-finalizing displaced action");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.commit(action, seq).await });
    }
}

impl Inner {
    /// Move the pending action (if any) into the finalizing state
    ///
    /// Taking the action out of the slot under the lock is the finalize
    /// guard: every other path then finds the slot empty and backs off.
    fn take_pending(&self) -> Option<(u64, PendingAction)> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Pending { seq, action } => {
                *slot = Slot::Finalizing { seq };
                Some((seq, action))
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    fn has_pending(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Pending { .. })
    }

    /// Timer-expiry entry point; `seq` guards against firing for a
    /// superseded action
    async fn finalize_expired(self: Arc<Self>, seq: u64) {
        let action = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Idle) {
                Slot::Pending {
                    seq: current,
                    action,
                } if current == seq => {
                    *slot = Slot::Finalizing { seq };
                    action
                }
                other => {
                    *slot = other;
                    return;
                }
            }
        };
        self.timer.cancel();
        self.commit(action, seq).await;
    }

    /// Perform the real network call for a finalizing action and
    /// reconcile the store with the outcome
    async fn commit(&self, action: PendingAction, seq: u64) {
        let kind = action.kind();
        let target = action.target();
        debug!(target: "greenroom::undo", seq, %kind, record = %target, "finalizing");

        let outcome = match &action {
            PendingAction::Create { draft, .. } => self.api.create(draft).await.map(Some),
            PendingAction::Update { id, draft, .. } => {
                self.api.update(*id, draft).await.map(|()| None)
            }
            PendingAction::Delete { id, .. } => self.api.delete(*id).await.map(|()| None),
        };

        match outcome {
            Ok(Some(canonical)) => {
                // Single atomic swap: observers never see the provisional
                // and the canonical entity side by side.
                let canonical_id = canonical.id;
                if self.store.replace(target, canonical) {
                    debug!(
                        target: "greenroom::undo",
                        seq,
                        provisional = %target,
                        server = %canonical_id,
                        "create committed; id swapped"
                    );
                } else {
                    warn!(
                        target: "greenroom::undo",
                        seq,
                        provisional = %target,
                        "provisional entity gone before reconciliation"
                    );
                }
            }
            Ok(None) => {
                // The optimistic state already matches the committed
                // intent; nothing to reconcile.
                debug!(target: "greenroom::undo", seq, %kind, record = %target, "committed");
            }
            Err(error) if error.is_session_fatal() => {
                error!(
                    target: "greenroom::undo",
                    seq, %kind, record = %target, %error,
                    "commit failed; session unrecoverable"
                );
                self.notify(Notice::SessionFatal {
                    message: error.to_string(),
                });
            }
            Err(error) => {
                warn!(
                    target: "greenroom::undo",
                    seq, %kind, record = %target, %error,
                    "commit failed; reloading from server"
                );
                self.notify(Notice::CommitFailed {
                    kind,
                    target,
                    error,
                });
                self.reload_from_server().await;
            }
        }

        self.settle(seq);
    }

    /// Return the slot to Idle if it still belongs to this action
    fn settle(&self, seq: u64) {
        let mut slot = self.slot.lock();
        if matches!(&*slot, Slot::Finalizing { seq: current } if *current == seq) {
            *slot = Slot::Idle;
        }
    }

    /// Pessimistic recovery: replace the store with server truth
    async fn reload_from_server(&self) {
        match self.fetch_and_apply().await {
            Ok(true) => {}
            Ok(false) => {
                debug!(target: "greenroom::undo", "reload skipped: a mutation is pending")
            }
            Err(error) if error.is_session_fatal() => {
                self.notify(Notice::SessionFatal {
                    message: error.to_string(),
                });
            }
            Err(error) => {
                warn!(target: "greenroom::undo", %error, "reload failed; store may lag server");
                self.notify(Notice::ReloadFailed { error });
            }
        }
    }

    async fn fetch_and_apply(&self) -> Result<bool> {
        if self.has_pending() {
            return Ok(false);
        }
        let entities = self.api.list().await?;
        // A mutation may have been submitted while the fetch was in
        // flight; its optimistic view wins.
        if self.has_pending() {
            return Ok(false);
        }
        self.store.replace_all(entities);
        Ok(true)
    }

    fn notify(&self, notice: Notice) {
        // A consumer that dropped the receiver simply stops seeing
        // notices.
        let _ = self.notices.send(notice);
    }
}
