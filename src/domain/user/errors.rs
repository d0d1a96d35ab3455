use uuid::Uuid;

use crate::event_sourcing::EventStoreError;
use crate::utils::IsTransient;

// ============================================================================
// User Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("email cannot be empty")]
    EmailEmpty,

    #[error("email already exists")]
    EmailExists,

    #[error("password cannot be empty")]
    PasswordEmpty,

    #[error("password confirmation didn't match")]
    PasswordConfirmationNotMatch,

    #[error("wrong password")]
    WrongPassword,

    #[error("invalid old password")]
    WrongOldPassword,

    #[error("name cannot be empty")]
    NameEmpty,

    #[error("gender cannot be empty")]
    GenderEmpty,

    #[error("user profile is already completed")]
    ProfileAlreadyCompleted,

    #[error("status already confirmed")]
    AlreadyConfirmed,

    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("user lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),
}

/// Failures surfaced to a user command's caller.
#[derive(Debug, thiserror::Error)]
pub enum UserCommandError {
    #[error(transparent)]
    Domain(#[from] UserError),

    #[error("user not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl IsTransient for UserCommandError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            UserCommandError::Store(EventStoreError::VersionConflict { .. })
        )
    }
}
