//! Greenroom: client-side mutation coordination for a venue CMS
//!
//! This crate is the in-process core that sits between an admin UI and
//! the venue's REST boundary. It owns two coupled mechanisms:
//!
//! - **Optimistic mutations with Undo**: every create/update/delete is
//!   applied to the in-memory [`snapshot`](MutationCoordinator::snapshot)
//!   immediately and committed to the server only after a cancellable
//!   grace period.
//! - **Session-refresh gate**: an expired session (HTTP 403) triggers
//!   exactly one refresh call; requests failing in the meantime are
//!   queued and replayed transparently once it resolves.
//!
//! ## Layers
//!
//! - [`greenroom_core`]: types, errors, abstract API traits
//! - [`greenroom_store`]: the ordered in-memory entity collection
//! - [`greenroom_client`]: AuthGate, GatedClient, reqwest binding
//! - [`greenroom_coordinator`]: ActionTimer + MutationCoordinator
//! - this crate: [`AdminSession`], which wires the production stack
//!
//! ## Quick start
//!
//! ```ignore
//! use greenroom::{AdminSession, ClientConfig, EventDraft};
//!
//! let (session, mut notices) = AdminSession::connect(ClientConfig::from_env())?;
//! session.login("admin", "secret").await?;
//! session.events().reload().await?;
//!
//! let draft = EventDraft {
//!     title: "Jazz Night".into(),
//!     description: "Live quartet".into(),
//!     image: None,
//!     ticket_link: "https://tickets.example/jazz".into(),
//! };
//! session.events().submit_create(draft);   // undoable for 10 s
//! session.events().cancel_pending();       // changed our mind
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod session;

pub use session::AdminSession;

// Re-export the public surface of the member crates
pub use greenroom_client::{AuthGate, ClientConfig, GatedClient, RestClient};
pub use greenroom_coordinator::{
    ActionTimer, CoordinatorConfig, MutationCoordinator, MutationKind, Notice, PendingMutation,
};
pub use greenroom_core::{
    AuthApi, EntityId, Error, EventDraft, EventRecord, ResourceApi, Result,
};
pub use greenroom_store::ResourceStore;
