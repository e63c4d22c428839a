//! Gated resource client
//!
//! [`GatedClient`] is the [`ResourceApi`] the coordinator actually talks
//! to: every operation is routed through the [`AuthGate`], so an expired
//! session is refreshed and replayed without the coordinator noticing.

use crate::gate::AuthGate;
use async_trait::async_trait;
use greenroom_core::{EntityId, EventDraft, EventRecord, ResourceApi, Result};
use std::sync::Arc;

/// A `ResourceApi` wrapper that recovers expired sessions transparently
#[derive(Clone)]
pub struct GatedClient {
    inner: Arc<dyn ResourceApi>,
    gate: Arc<AuthGate>,
}

impl GatedClient {
    /// Wrap a raw resource client with the refresh gate
    pub fn new(inner: Arc<dyn ResourceApi>, gate: Arc<AuthGate>) -> Self {
        Self { inner, gate }
    }
}

#[async_trait]
impl ResourceApi for GatedClient {
    async fn create(&self, draft: &EventDraft) -> Result<EventRecord> {
        self.gate.request(|| self.inner.create(draft)).await
    }

    async fn update(&self, id: EntityId, draft: &EventDraft) -> Result<()> {
        self.gate.request(|| self.inner.update(id, draft)).await
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        self.gate.request(|| self.inner.delete(id)).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.gate.request(|| self.inner.delete_all()).await
    }

    async fn list(&self) -> Result<Vec<EventRecord>> {
        self.gate.request(|| self.inner.list()).await
    }
}
