//! Core types for the Greenroom coordination layer
//!
//! This module defines the foundational types:
//! - EntityId: tagged identifier (server-issued vs. locally provisional)
//! - EventRecord: the managed record as stored and displayed
//! - EventDraft: the payload submitted by a mutation
//! - ProvisionalIdGen: per-session monotonic provisional id generator

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a managed record
///
/// The server issues plain numeric ids. While a create is still pending,
/// the record carries a locally generated provisional id instead. Keeping
/// the two in separate variants makes a collision between the local scheme
/// and the server scheme impossible by construction, and makes the
/// provisional→server swap at commit time an explicit, observable event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    /// Id assigned by the resource server
    Server(u64),
    /// Id generated locally for a not-yet-committed create
    Provisional(u64),
}

impl EntityId {
    /// Whether this id was generated locally and not yet confirmed
    pub fn is_provisional(&self) -> bool {
        matches!(self, EntityId::Provisional(_))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Server(n) => write!(f, "{}", n),
            EntityId::Provisional(n) => write!(f, "tmp-{}", n),
        }
    }
}

// The wire format carries a bare number; only server ids ever cross the
// wire. Serializing a provisional id is a logic error surfaced eagerly.
impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            EntityId::Server(n) => serializer.serialize_u64(*n),
            EntityId::Provisional(_) => Err(ser::Error::custom(
                "provisional ids must not be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = u64::deserialize(deserializer)?;
        Ok(EntityId::Server(raw))
    }
}

/// Generator for provisional ids
///
/// Seeded from the wall clock at construction and incremented per id, so
/// values are unique within a session and distinct across sessions for any
/// realistic usage. One generator is owned per coordinator; there is no
/// global instance.
#[derive(Debug)]
pub struct ProvisionalIdGen {
    next: AtomicU64,
}

impl ProvisionalIdGen {
    /// Create a generator seeded from the current wall clock
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(Utc::now().timestamp_millis() as u64),
        }
    }

    /// Allocate the next provisional id
    pub fn next_id(&self) -> EntityId {
        EntityId::Provisional(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for ProvisionalIdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// A managed event record
///
/// Doubles as the wire DTO: the server's JSON representation deserializes
/// directly into this type, with the bare numeric id mapping to
/// [`EntityId::Server`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Stable identity (provisional while a create is pending)
    pub id: EntityId,
    /// Display title
    pub title: String,
    /// Long-form description
    pub description: String,
    /// Server-relative image path, if an image was uploaded
    pub image: Option<String>,
    /// External ticket vendor link
    pub ticket_link: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Build the optimistic record for a pending create
    pub fn provisional(id: EntityId, draft: &EventDraft) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            image: draft.image.clone(),
            ticket_link: draft.ticket_link.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Payload of a create or update mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Display title
    pub title: String,
    /// Long-form description
    pub description: String,
    /// Image path or data to attach, if any
    pub image: Option<String>,
    /// External ticket vendor link
    pub ticket_link: String,
}

impl EventDraft {
    /// Overlay this draft onto an existing record, preserving identity
    /// and creation time
    pub fn apply_to(&self, record: &EventRecord) -> EventRecord {
        EventRecord {
            id: record.id,
            title: self.title.clone(),
            description: self.description.clone(),
            image: self.image.clone().or_else(|| record.image.clone()),
            ticket_link: self.ticket_link.clone(),
            created_at: record.created_at,
        }
    }
}
