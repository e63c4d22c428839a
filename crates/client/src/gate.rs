//! Session-refresh gate
//!
//! Every authenticated request goes through [`AuthGate::request`]. When a
//! request comes back with [`Error::ReauthRequired`], the gate either
//! starts the one allowed refresh call or, if one is already in flight,
//! parks the caller on a queue. When the refresh resolves, queued callers
//! are released in receipt order and each replays its own original
//! request exactly once.
//!
//! State transitions are driven only by response outcomes observed here;
//! no other component touches the refresh state.
//!
//! ```text
//! Idle --first ReauthRequired--> Refreshing --success--> Idle (queue replays)
//!                                    |
//!                                    +-------failure--> Idle (queue rejects,
//!                                                       session-fatal)
//! ```

use greenroom_core::{AuthApi, Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error};
use uuid::Uuid;

/// Outcome delivered to every caller parked behind a refresh
type RefreshOutcome = Result<()>;

/// Refresh lifecycle: idle, or one refresh in flight with a FIFO queue of
/// suspended callers awaiting its outcome
enum RefreshState {
    Idle,
    Refreshing {
        waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Serializes session refreshes and replays the requests that failed
/// while one was pending
///
/// The gate guarantees:
/// - at most one in-flight `refresh()` call at any time;
/// - a request is replayed at most once (a second `ReauthRequired` for
///   the same request propagates without another refresh);
/// - a failed refresh rejects the triggering request and every queued
///   one with the same session-fatal error.
pub struct AuthGate {
    auth: Arc<dyn AuthApi>,
    state: Mutex<RefreshState>,
}

impl AuthGate {
    /// Create a gate over the given auth API
    pub fn new(auth: Arc<dyn AuthApi>) -> Self {
        Self {
            auth,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Whether a refresh call is currently in flight
    pub fn is_refreshing(&self) -> bool {
        matches!(&*self.state.lock(), RefreshState::Refreshing { .. })
    }

    /// Number of requests parked behind the in-flight refresh
    pub fn queued_waiters(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Refreshing { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Issue a request through the gate
    ///
    /// `op` builds the request future; invoking it again replays the
    /// original request. Non-auth failures pass through untouched. An
    /// expired-session failure triggers (or joins) the refresh cycle and
    /// a single replay; if the replayed request expires again, that
    /// failure propagates as-is.
    pub async fn request<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        match op().await {
            Err(Error::ReauthRequired) => {}
            outcome => return outcome,
        }

        let request_id = Uuid::new_v4();
        debug!(target: "greenroom::gate", %request_id, "session expired; entering refresh gate");
        self.refresh_or_wait(request_id).await?;

        debug!(target: "greenroom::gate", %request_id, "replaying request after refresh");
        op().await
    }

    /// Join the in-flight refresh as a waiter, or become the refresher
    async fn refresh_or_wait(&self, request_id: Uuid) -> Result<()> {
        let parked = {
            let mut state = self.state.lock();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push_back(tx);
                    debug!(
                        target: "greenroom::gate",
                        %request_id,
                        queued = waiters.len(),
                        "refresh already in flight; parked for replay"
                    );
                    Some(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: VecDeque::new(),
                    };
                    None
                }
            }
        };

        match parked {
            Some(rx) => match rx.await {
                Ok(outcome) => outcome,
                // The refresher disappeared without resolving; nothing
                // left to wait for, treat the session as unrecoverable.
                Err(_) => Err(Error::refresh_failed("refresh abandoned")),
            },
            None => self.run_refresh(request_id).await,
        }
    }

    /// Perform the single refresh call and flush the queue
    async fn run_refresh(&self, request_id: Uuid) -> Result<()> {
        debug!(target: "greenroom::gate", %request_id, "issuing session refresh");
        let outcome: RefreshOutcome = match self.auth.refresh().await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(target: "greenroom::gate", error = %e, "session refresh failed");
                Err(Error::refresh_failed(e))
            }
        };

        let waiters = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => VecDeque::new(),
            }
        };
        debug!(
            target: "greenroom::gate",
            %request_id,
            flushed = waiters.len(),
            renewed = outcome.is_ok(),
            "refresh resolved; flushing queue"
        );
        // Receipt order: the queue is FIFO and released front to back.
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        outcome
    }
}
