use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::DeviceStatus;
use crate::event_sourcing::{decode_payload, DomainEvent, EventCodec};

// ============================================================================
// Device Domain Events
// ============================================================================

/// Union type for all device events.
///
/// Serialization is untagged: the wire discriminator lives in the
/// envelope's event name, not inside the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeviceEvent {
    Created(DeviceCreated),
    IDChanged(DeviceIDChanged),
    NameChanged(DeviceNameChanged),
    DescriptionChanged(DeviceDescriptionChanged),
    StatusChanged(DeviceStatusChanged),
    Removed(DeviceRemoved),
}

impl DeviceEvent {
    /// Every discriminator name a device stream can contain.
    pub const NAMES: [&'static str; 6] = [
        "DeviceCreated",
        "DeviceIDChanged",
        "DeviceNameChanged",
        "DeviceDescriptionChanged",
        "DeviceStatusChanged",
        "DeviceRemoved",
    ];
}

impl DomainEvent for DeviceEvent {
    fn event_name(&self) -> &'static str {
        match self {
            DeviceEvent::Created(_) => "DeviceCreated",
            DeviceEvent::IDChanged(_) => "DeviceIDChanged",
            DeviceEvent::NameChanged(_) => "DeviceNameChanged",
            DeviceEvent::DescriptionChanged(_) => "DeviceDescriptionChanged",
            DeviceEvent::StatusChanged(_) => "DeviceStatusChanged",
            DeviceEvent::Removed(_) => "DeviceRemoved",
        }
    }
}

/// Decode registry for the device stream, built once at startup.
pub fn codec() -> &'static EventCodec<DeviceEvent> {
    static CODEC: OnceLock<EventCodec<DeviceEvent>> = OnceLock::new();
    CODEC.get_or_init(|| {
        EventCodec::new("Device")
            .register("DeviceCreated", |v| {
                decode_payload("DeviceCreated", v).map(DeviceEvent::Created)
            })
            .register("DeviceIDChanged", |v| {
                decode_payload("DeviceIDChanged", v).map(DeviceEvent::IDChanged)
            })
            .register("DeviceNameChanged", |v| {
                decode_payload("DeviceNameChanged", v).map(DeviceEvent::NameChanged)
            })
            .register("DeviceDescriptionChanged", |v| {
                decode_payload("DeviceDescriptionChanged", v).map(DeviceEvent::DescriptionChanged)
            })
            .register("DeviceStatusChanged", |v| {
                decode_payload("DeviceStatusChanged", v).map(DeviceEvent::StatusChanged)
            })
            .register("DeviceRemoved", |v| {
                decode_payload("DeviceRemoved", v).map(DeviceEvent::Removed)
            })
    })
}

// Individual event types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCreated {
    pub uid: Uuid,
    pub device_id: String,
    pub name: String,
    pub topic_name: String,
    pub status: DeviceStatus,
    pub description: Option<String>,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIDChanged {
    pub uid: Uuid,
    pub device_id: String,
    pub topic_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceNameChanged {
    pub uid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptionChanged {
    pub uid: Uuid,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatusChanged {
    pub uid: Uuid,
    pub status: DeviceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRemoved {
    pub uid: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::{CodecError, EventEnvelope};
    use serde_json::json;

    fn sample_events() -> Vec<DeviceEvent> {
        let uid = Uuid::new_v4();
        vec![
            DeviceEvent::Created(DeviceCreated {
                uid,
                device_id: "dev-1".to_string(),
                name: "Sensor A".to_string(),
                topic_name: "topic-dev-1".to_string(),
                status: DeviceStatus::MetadataCreated,
                description: Some("greenhouse 2".to_string()),
                created_date: Utc::now(),
            }),
            DeviceEvent::IDChanged(DeviceIDChanged {
                uid,
                device_id: "dev-2".to_string(),
                topic_name: "topic-dev-2".to_string(),
            }),
            DeviceEvent::NameChanged(DeviceNameChanged {
                uid,
                name: "Sensor B".to_string(),
            }),
            DeviceEvent::DescriptionChanged(DeviceDescriptionChanged {
                uid,
                description: "moved to greenhouse 3".to_string(),
            }),
            DeviceEvent::StatusChanged(DeviceStatusChanged {
                uid,
                status: DeviceStatus::NodeRedCreated,
            }),
            DeviceEvent::Removed(DeviceRemoved { uid }),
        ]
    }

    #[test]
    fn every_variant_round_trips_through_the_codec() {
        for event in sample_events() {
            let envelope = codec().encode(&event).unwrap();
            let decoded = codec().decode(&envelope).unwrap();
            assert_eq!(event, decoded);
        }
    }

    #[test]
    fn envelope_names_match_the_registry() {
        for (event, expected) in sample_events().iter().zip(DeviceEvent::NAMES) {
            assert_eq!(event.event_name(), expected);
            let envelope = codec().encode(event).unwrap();
            assert_eq!(envelope.event_name, expected);
        }
    }

    #[test]
    fn timestamps_round_trip_exactly() {
        let event = DeviceEvent::Created(DeviceCreated {
            uid: Uuid::new_v4(),
            device_id: "dev-1".to_string(),
            name: "Sensor A".to_string(),
            topic_name: "topic-dev-1".to_string(),
            status: DeviceStatus::MetadataCreated,
            description: None,
            created_date: "2020-05-04T03:02:01.000000123Z".parse().unwrap(),
        });

        let envelope = codec().encode(&event).unwrap();
        let decoded = codec().decode(&envelope).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn unregistered_discriminator_fails_decode() {
        let envelope = EventEnvelope::new("DeviceTeleported", json!({ "uid": Uuid::new_v4() }));
        let err = codec().decode(&envelope).unwrap_err();
        assert!(matches!(err, CodecError::UnknownEventType(name) if name == "DeviceTeleported"));
    }
}
