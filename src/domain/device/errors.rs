use uuid::Uuid;

use crate::event_sourcing::EventStoreError;
use crate::utils::IsTransient;

// ============================================================================
// Device Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device ID cannot be empty")]
    DeviceIDEmpty,

    #[error("device ID already exists")]
    DeviceIDExists,

    #[error("device name cannot be empty")]
    NameEmpty,

    #[error("device is already removed")]
    AlreadyRemoved,

    #[error("device lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),
}

/// Failures surfaced to a device command's caller.
#[derive(Debug, thiserror::Error)]
pub enum DeviceCommandError {
    #[error(transparent)]
    Domain(#[from] DeviceError),

    #[error("device not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl IsTransient for DeviceCommandError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            DeviceCommandError::Store(EventStoreError::VersionConflict { .. })
        )
    }
}
