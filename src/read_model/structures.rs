use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::device::DeviceStatus;
use crate::domain::organization::OrganizationStatus;
use crate::domain::user::{PasswordHash, UserRole, UserStatus};

// ============================================================================
// Read Model Rows
// ============================================================================
//
// Denormalized, query-optimized snapshots of aggregate state, keyed by
// the same aggregate uid. Each row is a pure, eventually-consistent
// function of the event log: it is only ever written by projection
// handlers reacting to published events.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRead {
    pub uid: Uuid,
    pub device_id: String,
    pub name: String,
    pub topic_name: String,
    pub status: DeviceStatus,
    pub description: Option<String>,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRead {
    pub uid: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: Option<PasswordHash>,
    pub role: UserRole,
    pub status: UserStatus,
    pub organization_uid: Uuid,
    #[serde(skip_serializing, default)]
    pub invitation_code: i32,
    #[serde(skip_serializing, default)]
    pub reset_password_code: i32,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRead {
    pub uid: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub verification_code: i32,
    pub status: OrganizationStatus,
    #[serde(rename = "type")]
    pub org_type: Option<String>,
    pub total_member: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub created_date: DateTime<Utc>,
}

/// Session credentials issued when a user completes the invitation flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAuth {
    pub user_uid: Uuid,
    pub access_token: String,
    pub token_expires: i64,
    pub created_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
