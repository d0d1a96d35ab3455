use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::OrganizationStatus;
use crate::event_sourcing::{decode_payload, DomainEvent, EventCodec};

// ============================================================================
// Organization Domain Events
// ============================================================================

/// Union type for all organization events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrganizationEvent {
    Created(OrganizationCreated),
    NameChanged(OrganizationNameChanged),
    ProfileChanged(OrganizationProfileChanged),
    Verified(OrganizationVerified),
}

impl OrganizationEvent {
    /// Every discriminator name an organization stream can contain.
    pub const NAMES: [&'static str; 4] = [
        "OrganizationCreated",
        "OrganizationNameChanged",
        "OrganizationProfileChanged",
        "OrganizationVerified",
    ];
}

impl DomainEvent for OrganizationEvent {
    fn event_name(&self) -> &'static str {
        match self {
            OrganizationEvent::Created(_) => "OrganizationCreated",
            OrganizationEvent::NameChanged(_) => "OrganizationNameChanged",
            OrganizationEvent::ProfileChanged(_) => "OrganizationProfileChanged",
            OrganizationEvent::Verified(_) => "OrganizationVerified",
        }
    }
}

/// Decode registry for the organization stream, built once at startup.
pub fn codec() -> &'static EventCodec<OrganizationEvent> {
    static CODEC: OnceLock<EventCodec<OrganizationEvent>> = OnceLock::new();
    CODEC.get_or_init(|| {
        EventCodec::new("Organization")
            .register("OrganizationCreated", |v| {
                decode_payload("OrganizationCreated", v).map(OrganizationEvent::Created)
            })
            .register("OrganizationNameChanged", |v| {
                decode_payload("OrganizationNameChanged", v).map(OrganizationEvent::NameChanged)
            })
            .register("OrganizationProfileChanged", |v| {
                decode_payload("OrganizationProfileChanged", v)
                    .map(OrganizationEvent::ProfileChanged)
            })
            .register("OrganizationVerified", |v| {
                decode_payload("OrganizationVerified", v).map(OrganizationEvent::Verified)
            })
    })
}

// Individual event types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationCreated {
    pub uid: Uuid,
    pub name: String,
    pub email: String,
    pub verification_code: i32,
    pub status: OrganizationStatus,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationNameChanged {
    pub uid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationProfileChanged {
    pub uid: Uuid,
    pub name: String,
    pub org_type: Option<String>,
    pub total_member: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationVerified {
    pub uid: Uuid,
    pub email: String,
    pub status: OrganizationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::{CodecError, EventEnvelope};
    use serde_json::json;

    fn sample_events() -> Vec<OrganizationEvent> {
        let uid = Uuid::new_v4();
        vec![
            OrganizationEvent::Created(OrganizationCreated {
                uid,
                name: "Greenfield Farm".to_string(),
                email: "admin@greenfield.example".to_string(),
                verification_code: 123_456,
                status: OrganizationStatus::PendingConfirmation,
                created_date: Utc::now(),
            }),
            OrganizationEvent::NameChanged(OrganizationNameChanged {
                uid,
                name: "Greenfield Cooperative".to_string(),
            }),
            OrganizationEvent::ProfileChanged(OrganizationProfileChanged {
                uid,
                name: "Greenfield Cooperative".to_string(),
                org_type: Some("cooperative".to_string()),
                total_member: Some("11-50".to_string()),
                province: Some("West Java".to_string()),
                city: Some("Bandung".to_string()),
            }),
            OrganizationEvent::Verified(OrganizationVerified {
                uid,
                email: "admin@greenfield.example".to_string(),
                status: OrganizationStatus::Confirmed,
            }),
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
        for (event, expected) in sample_events().iter().zip(OrganizationEvent::NAMES) {
            assert_eq!(event.event_name(), expected);
        }
    }

    #[test]
    fn unregistered_discriminator_fails_decode() {
        let envelope =
            EventEnvelope::new("OrganizationDissolved", json!({ "uid": Uuid::new_v4() }));
        let err = codec().decode(&envelope).unwrap_err();
        assert!(matches!(err, CodecError::UnknownEventType(_)));
    }
}
