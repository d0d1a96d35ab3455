use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::event::{DomainEvent, EventEnvelope};

// ============================================================================
// Event Codec - Envelope <-> Typed Event
// ============================================================================
//
// The event log is heterogeneous: many event shapes share one storage
// column. The codec is the single place where a typed event is
// reconstructed from a raw envelope. Decoding dispatches on the
// discriminator name through an explicit registry built once at startup;
// an unregistered name is a hard error, never a silent skip, because a
// dropped event would desynchronize read models from the log.
//
// ============================================================================

/// Decoder for one registered event name.
pub type DecodeFn<E> = fn(&Value) -> Result<E, CodecError>;

/// A check applied to one named payload field, when present.
///
/// Used for sensitive material: a credential field must already be an
/// opaque hash by the time it reaches the wire, in either direction.
#[derive(Clone, Copy)]
pub struct FieldGuard {
    pub field: &'static str,
    pub check: fn(&Value) -> bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("malformed payload for {event_name}: {source}")]
    MalformedPayload {
        event_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize event payload: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("field '{field}' of {event_name} must be a hashed credential")]
    PlaintextCredential {
        event_name: String,
        field: &'static str,
    },
}

/// Registry-based codec for one aggregate kind's events.
///
/// Built once per aggregate at startup and read-only afterwards.
pub struct EventCodec<E> {
    aggregate_type: &'static str,
    decoders: HashMap<&'static str, DecodeFn<E>>,
    guards: Vec<FieldGuard>,
}

impl<E: DomainEvent + Serialize> EventCodec<E> {
    pub fn new(aggregate_type: &'static str) -> Self {
        Self {
            aggregate_type,
            decoders: HashMap::new(),
            guards: Vec::new(),
        }
    }

    /// Register the decoder for one discriminator name.
    pub fn register(mut self, event_name: &'static str, decode: DecodeFn<E>) -> Self {
        self.decoders.insert(event_name, decode);
        self
    }

    /// Register a field guard applied to every payload in both directions.
    pub fn guard(mut self, guard: FieldGuard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }

    /// Attach the event's discriminator name and serialize its payload.
    pub fn encode(&self, event: &E) -> Result<EventEnvelope, CodecError> {
        let event_name = event.event_name();
        let payload = serde_json::to_value(event).map_err(CodecError::Serialize)?;
        self.check_guards(event_name, &payload)?;

        Ok(EventEnvelope::new(event_name, payload))
    }

    /// Reconstruct the concrete typed event from an envelope.
    pub fn decode(&self, envelope: &EventEnvelope) -> Result<E, CodecError> {
        let decode = self
            .decoders
            .get(envelope.event_name.as_str())
            .ok_or_else(|| CodecError::UnknownEventType(envelope.event_name.clone()))?;

        self.check_guards(&envelope.event_name, &envelope.event_data)?;

        decode(&envelope.event_data)
    }

    fn check_guards(&self, event_name: &str, payload: &Value) -> Result<(), CodecError> {
        for guard in &self.guards {
            match payload.get(guard.field) {
                None | Some(Value::Null) => continue,
                Some(value) => {
                    if !(guard.check)(value) {
                        return Err(CodecError::PlaintextCredential {
                            event_name: event_name.to_string(),
                            field: guard.field,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Deserialize one registered payload into its concrete event struct.
pub fn decode_payload<T: DeserializeOwned>(
    event_name: &'static str,
    value: &Value,
) -> Result<T, CodecError> {
    serde_json::from_value(value.clone()).map_err(|source| CodecError::MalformedPayload {
        event_name,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Opened {
        gate: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sealed {
        secret: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(untagged)]
    enum GateEvent {
        Opened(Opened),
        Sealed(Sealed),
    }

    impl DomainEvent for GateEvent {
        fn event_name(&self) -> &'static str {
            match self {
                GateEvent::Opened(_) => "GateOpened",
                GateEvent::Sealed(_) => "GateSealed",
            }
        }
    }

    fn test_codec() -> EventCodec<GateEvent> {
        EventCodec::new("Gate")
            .register("GateOpened", |v| {
                decode_payload("GateOpened", v).map(GateEvent::Opened)
            })
            .register("GateSealed", |v| {
                decode_payload("GateSealed", v).map(GateEvent::Sealed)
            })
            .guard(FieldGuard {
                field: "secret",
                check: |v| v.as_str().is_some_and(|s| s.starts_with("$2")),
            })
    }

    #[test]
    fn encode_then_decode_returns_equal_event() {
        let codec = test_codec();
        let event = GateEvent::Opened(Opened {
            gate: "north".to_string(),
        });

        let envelope = codec.encode(&event).unwrap();
        assert_eq!(envelope.event_name, "GateOpened");

        let decoded = codec.decode(&envelope).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn decode_rejects_unregistered_name() {
        let codec = test_codec();
        let envelope = EventEnvelope::new("GateTeleported", json!({ "gate": "north" }));

        let err = codec.decode(&envelope).unwrap_err();
        assert!(matches!(err, CodecError::UnknownEventType(name) if name == "GateTeleported"));
    }

    #[test]
    fn decode_rejects_malformed_payload() {
        let codec = test_codec();
        let envelope = EventEnvelope::new("GateOpened", json!({ "gate": 42 }));

        let err = codec.decode(&envelope).unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload { .. }));
    }

    #[test]
    fn guard_rejects_plaintext_field_on_decode() {
        let codec = test_codec();
        let envelope = EventEnvelope::new("GateSealed", json!({ "secret": "hunter2" }));

        let err = codec.decode(&envelope).unwrap_err();
        assert!(matches!(
            err,
            CodecError::PlaintextCredential { field: "secret", .. }
        ));
    }

    #[test]
    fn guard_rejects_plaintext_field_on_encode() {
        let codec = test_codec();
        let event = GateEvent::Sealed(Sealed {
            secret: "hunter2".to_string(),
        });

        let err = codec.encode(&event).unwrap_err();
        assert!(matches!(err, CodecError::PlaintextCredential { .. }));
    }

    #[test]
    fn guard_accepts_hashed_field() {
        let codec = test_codec();
        let event = GateEvent::Sealed(Sealed {
            secret: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
        });

        let envelope = codec.encode(&event).unwrap();
        let decoded = codec.decode(&envelope).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn guard_ignores_absent_and_null_fields() {
        let codec = test_codec();
        let envelope = EventEnvelope::new("GateOpened", json!({ "gate": "south" }));
        assert!(codec.decode(&envelope).is_ok());
    }
}
