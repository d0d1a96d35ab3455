use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::value_objects::{PasswordHash, UserRole, UserStatus};
use crate::event_sourcing::{decode_payload, DomainEvent, EventCodec, FieldGuard};

// ============================================================================
// User Domain Events
// ============================================================================
//
// Credential fields travel only as bcrypt hashes. The codec guards the
// `password` and `new_password` payload fields in both directions, so a
// plaintext value can neither be written to the log nor replayed out of
// it.
//
// ============================================================================

/// Union type for all user events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserEvent {
    Created(UserCreated),
    PasswordChanged(PasswordChanged),
    ProfileChanged(UserProfileChanged),
    Verified(UserVerified),
    ResetPasswordRequested(ResetPasswordRequested),
    InitialProfileSet(InitialUserProfileSet),
}

impl UserEvent {
    /// Every discriminator name a user stream can contain.
    pub const NAMES: [&'static str; 6] = [
        "UserCreated",
        "PasswordChanged",
        "UserProfileChanged",
        "UserVerified",
        "ResetPasswordRequested",
        "InitialUserProfileSet",
    ];
}

impl DomainEvent for UserEvent {
    fn event_name(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => "UserCreated",
            UserEvent::PasswordChanged(_) => "PasswordChanged",
            UserEvent::ProfileChanged(_) => "UserProfileChanged",
            UserEvent::Verified(_) => "UserVerified",
            UserEvent::ResetPasswordRequested(_) => "ResetPasswordRequested",
            UserEvent::InitialProfileSet(_) => "InitialUserProfileSet",
        }
    }
}

fn is_hashed_credential(value: &Value) -> bool {
    value.as_str().is_some_and(PasswordHash::looks_hashed)
}

/// Decode registry for the user stream, built once at startup.
pub fn codec() -> &'static EventCodec<UserEvent> {
    static CODEC: OnceLock<EventCodec<UserEvent>> = OnceLock::new();
    CODEC.get_or_init(|| {
        EventCodec::new("User")
            .register("UserCreated", |v| {
                decode_payload("UserCreated", v).map(UserEvent::Created)
            })
            .register("PasswordChanged", |v| {
                decode_payload("PasswordChanged", v).map(UserEvent::PasswordChanged)
            })
            .register("UserProfileChanged", |v| {
                decode_payload("UserProfileChanged", v).map(UserEvent::ProfileChanged)
            })
            .register("UserVerified", |v| {
                decode_payload("UserVerified", v).map(UserEvent::Verified)
            })
            .register("ResetPasswordRequested", |v| {
                decode_payload("ResetPasswordRequested", v).map(UserEvent::ResetPasswordRequested)
            })
            .register("InitialUserProfileSet", |v| {
                decode_payload("InitialUserProfileSet", v).map(UserEvent::InitialProfileSet)
            })
            .guard(FieldGuard {
                field: "password",
                check: is_hashed_credential,
            })
            .guard(FieldGuard {
                field: "new_password",
                check: is_hashed_credential,
            })
    })
}

// Individual event types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreated {
    pub uid: Uuid,
    pub email: String,
    pub password: Option<PasswordHash>,
    pub organization_uid: Uuid,
    pub invitation_code: i32,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordChanged {
    pub uid: Uuid,
    pub new_password: PasswordHash,
    pub date_changed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfileChanged {
    pub uid: Uuid,
    pub name: String,
    pub gender: String,
    pub birth_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserVerified {
    pub uid: Uuid,
    pub email: String,
    pub status: UserStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetPasswordRequested {
    pub uid: Uuid,
    pub email: String,
    pub reset_password_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialUserProfileSet {
    pub uid: Uuid,
    pub name: String,
    pub gender: String,
    pub birth_date: DateTime<Utc>,
    pub password: PasswordHash,
    pub status: UserStatus,
    pub date_changed: DateTime<Utc>,
}
