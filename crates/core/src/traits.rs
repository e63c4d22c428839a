//! Abstract API traits
//!
//! The coordination layer never talks to a concrete server. It depends on
//! two narrow async traits: `ResourceApi` for the managed records and
//! `AuthApi` for session renewal. The production binding lives in
//! `greenroom-client`; tests substitute in-memory fakes.

use crate::error::Result;
use crate::types::{EntityId, EventDraft, EventRecord};
use async_trait::async_trait;

/// Abstract resource API for managed event records
///
/// Implementations are expected to report an expired session as
/// [`crate::Error::ReauthRequired`] so the auth gate can recover it.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Create a record; the server returns the canonical entity with its
    /// issued id
    async fn create(&self, draft: &EventDraft) -> Result<EventRecord>;

    /// Overwrite the record identified by `id` with the draft
    async fn update(&self, id: EntityId, draft: &EventDraft) -> Result<()>;

    /// Delete the record identified by `id`
    async fn delete(&self, id: EntityId) -> Result<()>;

    /// Delete every record of the collection
    async fn delete_all(&self) -> Result<()>;

    /// Fetch the full collection in server order
    async fn list(&self) -> Result<Vec<EventRecord>>;
}

/// Abstract auth API
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Renew the session. An error means the session cannot be renewed
    /// and is treated as session-fatal by the gate.
    async fn refresh(&self) -> Result<()>;
}
