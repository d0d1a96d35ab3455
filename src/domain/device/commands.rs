use uuid::Uuid;

use super::value_objects::DeviceStatus;

// ============================================================================
// Device Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum DeviceCommand {
    Create {
        device_id: String,
        name: String,
        description: Option<String>,
    },
    ChangeID {
        uid: Uuid,
        device_id: String,
    },
    ChangeName {
        uid: Uuid,
        name: String,
    },
    ChangeDescription {
        uid: Uuid,
        description: String,
    },
    ChangeStatus {
        uid: Uuid,
        status: DeviceStatus,
    },
    Remove {
        uid: Uuid,
    },
}
