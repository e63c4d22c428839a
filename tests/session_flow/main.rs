//! Full-stack session flow tests
//!
//! Wires a fake in-memory server through the real AuthGate, GatedClient,
//! and MutationCoordinator — the same assembly `AdminSession` performs,
//! minus the HTTP transport — and exercises the undo flow end to end,
//! including session expiry in the middle of a commit.

use async_trait::async_trait;
use chrono::Utc;
use greenroom::{
    AuthApi, AuthGate, CoordinatorConfig, EntityId, Error, EventDraft, EventRecord, GatedClient,
    MutationCoordinator, Notice, ResourceApi, Result,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::yield_now;
use tokio::time::advance;

/// In-memory stand-in for the venue API with a controllable session
struct FakeServer {
    records: Mutex<Vec<EventRecord>>,
    next_id: AtomicU64,
    session_valid: AtomicBool,
    refresh_allowed: AtomicBool,
    refresh_calls: AtomicUsize,
}

impl FakeServer {
    fn new(ids: &[u64]) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(ids.iter().map(|n| record(*n)).collect()),
            next_id: AtomicU64::new(100),
            session_valid: AtomicBool::new(true),
            refresh_allowed: AtomicBool::new(true),
            refresh_calls: AtomicUsize::new(0),
        })
    }

    fn expire_session(&self) {
        self.session_valid.store(false, Ordering::SeqCst);
    }

    fn revoke_refresh(&self) {
        self.refresh_allowed.store(false, Ordering::SeqCst);
    }

    fn ids(&self) -> Vec<EntityId> {
        self.records.lock().iter().map(|r| r.id).collect()
    }

    fn check_session(&self) -> Result<()> {
        if self.session_valid.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ReauthRequired)
        }
    }
}

fn record(n: u64) -> EventRecord {
    EventRecord {
        id: EntityId::Server(n),
        title: format!("event-{}", n),
        description: "description".to_string(),
        image: None,
        ticket_link: "https://tickets.example".to_string(),
        created_at: Utc::now(),
    }
}

fn draft(title: &str) -> EventDraft {
    EventDraft {
        title: title.to_string(),
        description: "description".to_string(),
        image: None,
        ticket_link: "https://tickets.example".to_string(),
    }
}

#[async_trait]
impl ResourceApi for FakeServer {
    async fn create(&self, draft: &EventDraft) -> Result<EventRecord> {
        self.check_session()?;
        let created = EventRecord {
            id: EntityId::Server(self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: draft.title.clone(),
            description: draft.description.clone(),
            image: draft.image.clone(),
            ticket_link: draft.ticket_link.clone(),
            created_at: Utc::now(),
        };
        self.records.lock().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: EntityId, draft: &EventDraft) -> Result<()> {
        self.check_session()?;
        let mut records = self.records.lock();
        if let Some(existing) = records.iter_mut().find(|r| r.id == id) {
            let updated = draft.apply_to(existing);
            *existing = updated;
        }
        Ok(())
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        self.check_session()?;
        self.records.lock().retain(|r| r.id != id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.check_session()?;
        self.records.lock().clear();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EventRecord>> {
        self.check_session()?;
        Ok(self.records.lock().clone())
    }
}

#[async_trait]
impl AuthApi for FakeServer {
    async fn refresh(&self) -> Result<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.refresh_allowed.load(Ordering::SeqCst) {
            self.session_valid.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(Error::Rejected {
                status: 401,
                message: "refresh token revoked".to_string(),
            })
        }
    }
}

/// Assemble the stack the way `AdminSession` does, over the fake server
fn stack(
    server: &Arc<FakeServer>,
) -> (MutationCoordinator, UnboundedReceiver<Notice>) {
    let gate = Arc::new(AuthGate::new(server.clone()));
    let gated = Arc::new(GatedClient::new(server.clone(), gate));
    MutationCoordinator::new(gated, CoordinatorConfig::default())
}

async fn settle() {
    for _ in 0..30 {
        yield_now().await;
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[tokio::test(start_paused = true)]
async fn undo_cycle_never_reaches_the_server() {
    init_tracing();
    let server = FakeServer::new(&[1, 2, 5, 9]);
    let (events, _notices) = stack(&server);

    assert!(events.reload().await.unwrap());
    let before = events.snapshot();

    events.submit_delete(EntityId::Server(5));
    let visible: Vec<EntityId> = events.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(
        visible,
        vec![
            EntityId::Server(1),
            EntityId::Server(2),
            EntityId::Server(9)
        ],
        "delete is visible immediately"
    );

    advance(Duration::from_secs(5)).await;
    settle().await;
    events.cancel_pending();

    assert_eq!(events.snapshot(), before, "undo restores the exact view");
    advance(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(
        server.ids(),
        vec![
            EntityId::Server(1),
            EntityId::Server(2),
            EntityId::Server(5),
            EntityId::Server(9)
        ],
        "the server never saw the delete"
    );
}

#[tokio::test(start_paused = true)]
async fn create_commits_at_deadline_with_id_swap() {
    init_tracing();
    let server = FakeServer::new(&[1]);
    let (events, _notices) = stack(&server);
    events.reload().await.unwrap();

    let provisional = events.submit_create(draft("premiere"));
    assert!(provisional.is_provisional());
    assert_eq!(events.snapshot().len(), 2);

    advance(Duration::from_secs(10)).await;
    settle().await;

    let ids: Vec<EntityId> = events.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![EntityId::Server(1), EntityId::Server(100)]);
    assert_eq!(server.ids(), ids, "store and server agree after commit");
    assert!(events.pending().is_none());
}

#[tokio::test(start_paused = true)]
async fn expired_session_is_refreshed_once_and_commit_replayed() {
    init_tracing();
    let server = FakeServer::new(&[1, 2]);
    let (events, mut notices) = stack(&server);
    events.reload().await.unwrap();

    // The session dies between the optimistic mutation and its commit
    server.expire_session();
    events.submit_delete(EntityId::Server(1));
    events.force_commit_now().await;
    settle().await;

    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.ids(), vec![EntityId::Server(2)], "replay landed");
    let visible: Vec<EntityId> = events.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(visible, vec![EntityId::Server(2)]);
    assert!(notices.try_recv().is_err(), "recovery is silent");
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_is_session_fatal() {
    init_tracing();
    let server = FakeServer::new(&[1]);
    let (events, mut notices) = stack(&server);
    events.reload().await.unwrap();

    server.expire_session();
    server.revoke_refresh();
    events.submit_delete(EntityId::Server(1));
    events.force_commit_now().await;
    settle().await;

    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    match notices.try_recv().unwrap() {
        Notice::SessionFatal { message } => {
            assert!(message.contains("refresh"), "unexpected message: {}", message);
        }
        other => panic!("expected SessionFatal, got {:?}", other),
    }
    assert_eq!(server.ids(), vec![EntityId::Server(1)], "nothing committed");
}

#[tokio::test(start_paused = true)]
async fn displaced_action_commits_through_the_gate() {
    init_tracing();
    let server = FakeServer::new(&[2, 7]);
    let (events, _notices) = stack(&server);
    events.reload().await.unwrap();

    // Delete is pending when the session expires; submitting the update
    // force-finalizes the delete, which recovers through the gate.
    events.submit_delete(EntityId::Server(7));
    server.expire_session();
    events.submit_update(EntityId::Server(2), draft("renamed"));
    settle().await;

    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.ids(), vec![EntityId::Server(2)], "delete committed");

    advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(
        server.records.lock()[0].title,
        "renamed",
        "update committed at its own deadline"
    );
}
