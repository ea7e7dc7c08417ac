//! Collaborator store interfaces.
//!
//! The event/attendee CRUD layer and the user directory live outside this
//! crate; these traits are the read-only slice the delivery pipeline
//! needs, with in-memory implementations for tests and embedding.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::{Attendee, Event};

/// Read-only event lookup.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetches an event by id.
    async fn event(&self, id: &str) -> Result<Option<Event>, StoreError>;
}

/// Read-only attendee lookup.
#[async_trait]
pub trait AttendeeStore: Send + Sync {
    /// All attendees of an event, in store order.
    async fn attendees_for_event(&self, event_id: &str) -> Result<Vec<Attendee>, StoreError>;
}

/// Optional lookup of a stored signature-image reference by coordinator
/// display name.
#[async_trait]
pub trait SignatureDirectory: Send + Sync {
    /// Signature reference (data URI or URL) for a coordinator, if stored.
    async fn signature_for(&self, name: &str) -> Result<Option<String>, StoreError>;
}

/// In-memory event store.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: Mutex<HashMap<String, Event>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an event, keyed by its id.
    pub fn insert(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.insert(event.id.clone(), event);
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn event(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let events = self
            .events
            .lock()
            .map_err(|_| StoreError::read("event store mutex poisoned"))?;
        Ok(events.get(id).cloned())
    }
}

/// In-memory attendee store.
#[derive(Default)]
pub struct InMemoryAttendeeStore {
    attendees: Mutex<Vec<Attendee>>,
}

impl InMemoryAttendeeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an attendee.
    pub fn insert(&self, attendee: Attendee) {
        if let Ok(mut attendees) = self.attendees.lock() {
            attendees.push(attendee);
        }
    }
}

#[async_trait]
impl AttendeeStore for InMemoryAttendeeStore {
    async fn attendees_for_event(&self, event_id: &str) -> Result<Vec<Attendee>, StoreError> {
        let attendees = self
            .attendees
            .lock()
            .map_err(|_| StoreError::read("attendee store mutex poisoned"))?;
        Ok(attendees.iter().filter(|a| a.event_id == event_id).cloned().collect())
    }
}

/// In-memory signature directory.
#[derive(Default)]
pub struct InMemorySignatureDirectory {
    signatures: Mutex<HashMap<String, String>>,
}

impl InMemorySignatureDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a signature reference under a coordinator display name.
    pub fn insert(&self, name: impl Into<String>, reference: impl Into<String>) {
        if let Ok(mut signatures) = self.signatures.lock() {
            signatures.insert(name.into(), reference.into());
        }
    }
}

#[async_trait]
impl SignatureDirectory for InMemorySignatureDirectory {
    async fn signature_for(&self, name: &str) -> Result<Option<String>, StoreError> {
        let signatures = self
            .signatures
            .lock()
            .map_err(|_| StoreError::read("signature directory mutex poisoned"))?;
        Ok(signatures.get(name).cloned())
    }
}
