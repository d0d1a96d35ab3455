use uuid::Uuid;

use crate::event_sourcing::EventStoreError;
use crate::utils::IsTransient;

// ============================================================================
// Organization Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrganizationError {
    #[error("email cannot be empty")]
    EmailEmpty,

    #[error("email already exists")]
    EmailExists,

    #[error("name cannot be empty")]
    NameEmpty,

    #[error("status already confirmed")]
    AlreadyConfirmed,

    #[error("organization lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),
}

/// Failures surfaced to an organization command's caller.
#[derive(Debug, thiserror::Error)]
pub enum OrganizationCommandError {
    #[error(transparent)]
    Domain(#[from] OrganizationError),

    #[error("organization not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl IsTransient for OrganizationCommandError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            OrganizationCommandError::Store(EventStoreError::VersionConflict { .. })
        )
    }
}
