use uuid::Uuid;

use super::event::DomainEvent;
use crate::event_sourcing::store::StoredEvent;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not stored directly)
// 2. Business methods validate BEFORE emitting events
// 3. Events represent facts that have already happened
// 4. All state writes happen inside the transition function, keyed by
//    event variant
// 5. The uncommitted list holds events recorded since load/create and
//    not yet appended to the event store
//
// This is the GENERIC aggregate trait that works for ANY domain aggregate.
//
// ============================================================================

/// Generic aggregate root - all event-sourced aggregates implement this.
///
/// `Default` is the zero state that replay folds from; a brand-new
/// aggregate starts at version 0 with an empty uncommitted list.
pub trait AggregateRoot: Default + Send + Sync {
    type Event: DomainEvent;
    type Error;

    /// Aggregate identity, the stream key in the event store.
    fn aggregate_id(&self) -> Uuid;

    /// Count of events already durably appended for this aggregate.
    fn version(&self) -> i64;

    fn set_version(&mut self, version: i64);

    /// Events recorded since the aggregate was loaded or created and not
    /// yet appended to the event store.
    fn uncommitted_events(&self) -> &[Self::Event];

    fn uncommitted_events_mut(&mut self) -> &mut Vec<Self::Event>;

    /// Apply one event to state.
    ///
    /// Total and infallible: state fields are written here and nowhere
    /// else, and an event that carries nothing for this aggregate leaves
    /// state untouched. Events must be applied in ascending version
    /// order; the event store's ordering contract guarantees that.
    fn transition(&mut self, event: &Self::Event);

    /// Record a new event: apply it immediately so in-memory state
    /// reflects the change, then queue it for persistence.
    fn track_change(&mut self, event: Self::Event) {
        self.transition(&event);
        self.uncommitted_events_mut().push(event);
    }

    /// Drain the uncommitted list once its events have been handed to
    /// the event store.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(self.uncommitted_events_mut())
    }

    /// Rebuild current state by folding the full history through the
    /// transition function, in ascending version order, from the zero
    /// state. The resulting version equals the last stored version.
    fn load_from_history(history: &[StoredEvent<Self::Event>]) -> Self {
        let mut aggregate = Self::default();

        for record in history {
            aggregate.transition(&record.event);
            aggregate.set_version(record.version);
        }

        aggregate
    }
}
