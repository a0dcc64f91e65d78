//! Core aggregate and domain event traits.

use common::TableNumber;
use serde::{Serialize, de::DeserializeOwned};
use table_store::Version;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name, used in logs and metric labels.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates persisted as versioned documents.
///
/// Command methods inspect the current state and return the events they
/// would produce, or an error. Nothing mutates the aggregate except
/// [`Aggregate::apply`], so a rejected command never leaves partial state
/// behind.
pub trait Aggregate: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the key the aggregate is stored under.
    fn key(&self) -> TableNumber;

    /// Returns the document version the aggregate was loaded at.
    fn version(&self) -> Version;

    /// Sets the document version.
    ///
    /// Called by the command handler after loading or saving.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
