use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::value_objects::UserRole;

// ============================================================================
// User Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum UserCommand {
    Create {
        organization_uid: Uuid,
        email: String,
        role: UserRole,
    },
    ChangePassword {
        uid: Uuid,
        old_password: String,
        new_password: String,
        confirm_password: String,
    },
    ChangeProfile {
        uid: Uuid,
        name: String,
        gender: String,
        birth_date: DateTime<Utc>,
    },
    SetInitialProfile {
        uid: Uuid,
        name: String,
        gender: String,
        birth_date: DateTime<Utc>,
        password: String,
    },
    VerifyInvitation {
        uid: Uuid,
    },
    RequestResetPassword {
        uid: Uuid,
    },
    ResetPassword {
        uid: Uuid,
        new_password: String,
    },
}
