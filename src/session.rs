//! Admin session facade
//!
//! Wires the production stack together: a cookie-carrying [`RestClient`]
//! behind an [`AuthGate`], a [`GatedClient`] over both, and a
//! [`MutationCoordinator`] on top. One `AdminSession` is created per
//! authenticated admin session; dropping it tears the whole stack down.

use greenroom_client::{AuthGate, ClientConfig, GatedClient, RestClient};
use greenroom_coordinator::{CoordinatorConfig, MutationCoordinator, Notice};
use greenroom_core::{ResourceApi, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

/// The assembled coordination stack for one admin session
pub struct AdminSession {
    rest: Arc<RestClient>,
    gate: Arc<AuthGate>,
    events: MutationCoordinator,
}

impl AdminSession {
    /// Build the stack against the venue API
    ///
    /// Returns the session and the notice channel carrying commit
    /// failures and session-fatal events for the UI to surface.
    pub fn connect(config: ClientConfig) -> Result<(Self, UnboundedReceiver<Notice>)> {
        Self::connect_with(config, CoordinatorConfig::default())
    }

    /// Build the stack with a non-default grace period
    pub fn connect_with(
        config: ClientConfig,
        coordinator_config: CoordinatorConfig,
    ) -> Result<(Self, UnboundedReceiver<Notice>)> {
        debug!(target: "greenroom::session", base_url = %config.base_url, "assembling session stack");
        let rest = Arc::new(RestClient::new(config)?);
        let gate = Arc::new(AuthGate::new(rest.clone()));
        let gated = Arc::new(GatedClient::new(rest.clone(), gate.clone()));
        let (events, notices) = MutationCoordinator::new(gated, coordinator_config);
        Ok((Self { rest, gate, events }, notices))
    }

    /// The event-collection coordinator
    pub fn events(&self) -> &MutationCoordinator {
        &self.events
    }

    /// Whether a session refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.gate.is_refreshing()
    }

    /// Authenticate with credentials; the session cookie lands on the
    /// underlying client
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.rest.login(username, password).await
    }

    /// Remove every event, then resync the store
    ///
    /// Any pending mutation is committed first so the wipe cannot be
    /// reordered against it.
    pub async fn clear_events(&self) -> Result<()> {
        self.events.force_commit_now().await;
        self.gate.request(|| self.rest.delete_all()).await?;
        self.events.reload().await?;
        Ok(())
    }
}
