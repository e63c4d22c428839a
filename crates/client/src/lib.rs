//! Authenticated HTTP client layer for Greenroom
//!
//! This crate provides the client side of the coordination core:
//! - **AuthGate**: detects expired-session failures, serializes the
//!   refresh call so at most one is ever in flight, queues every request
//!   that failed while a refresh was pending, and replays them
//!   transparently once it resolves.
//! - **GatedClient**: a [`ResourceApi`](greenroom_core::ResourceApi)
//!   implementation that routes every operation through the gate.
//! - **RestClient**: the reqwest binding to the venue API (cookie-based
//!   sessions, HTTP 403 as the reauthentication signal).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gate;
pub mod gated;
pub mod rest;

pub use gate::AuthGate;
pub use gated::GatedClient;
pub use rest::{ClientConfig, RestClient};
