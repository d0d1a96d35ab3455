use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Event Envelope - Wire Representation of Domain Events
// ============================================================================
//
// Every domain event is stored and transmitted as a generic
// (discriminator name, untyped payload) pair. The envelope exists ONLY at
// the serialization boundary; aggregates never see it.
//
// ============================================================================

/// A typed domain event belonging to exactly one aggregate instance.
///
/// Events are immutable facts: write-once, never mutated or deleted.
/// Each carries only the fields that changed plus the context needed to
/// re-derive state during replay.
pub trait DomainEvent: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Stable discriminator name for this concrete event,
    /// e.g. `"DeviceCreated"`.
    fn event_name(&self) -> &'static str;
}

/// Wire-level pairing of an event's discriminator name and its untyped
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_name: String,
    pub event_data: Value,
}

impl EventEnvelope {
    pub fn new(event_name: impl Into<String>, event_data: Value) -> Self {
        Self {
            event_name: event_name.into(),
            event_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = EventEnvelope::new(
            "DeviceNameChanged",
            json!({ "uid": "3b4f5ff3-a767-4d35-b82c-d79b0b8d2b9a", "name": "Sensor A" }),
        );

        let serialized = serde_json::to_string(&envelope).unwrap();
        let deserialized: EventEnvelope = serde_json::from_str(&serialized).unwrap();

        assert_eq!(envelope, deserialized);
    }

    #[test]
    fn envelope_preserves_discriminator_name() {
        let envelope = EventEnvelope::new("UserVerified", json!({}));
        assert_eq!(envelope.event_name, "UserVerified");
    }
}
