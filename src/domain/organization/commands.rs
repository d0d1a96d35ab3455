use uuid::Uuid;

use super::value_objects::OrganizationProfile;

// ============================================================================
// Organization Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrganizationCommand {
    Create {
        name: String,
        email: String,
    },
    ChangeName {
        uid: Uuid,
        name: String,
    },
    ChangeProfile {
        uid: Uuid,
        name: String,
        profile: OrganizationProfile,
    },
    Verify {
        uid: Uuid,
    },
}
