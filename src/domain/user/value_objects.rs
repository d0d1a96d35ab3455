use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// User Value Objects
// ============================================================================

/// Role a user holds inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::User => "USER",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(UserRole::Admin),
            "USER" => Ok(UserRole::User),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    #[serde(rename = "PENDING_CONFIRMATION")]
    PendingConfirmation,
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::PendingConfirmation => "PENDING_CONFIRMATION",
            UserStatus::Confirmed => "CONFIRMED",
            UserStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_CONFIRMATION" => Ok(UserStatus::PendingConfirmation),
            "CONFIRMED" => Ok(UserStatus::Confirmed),
            "COMPLETED" => Ok(UserStatus::Completed),
            other => Err(format!("unknown user status: {other}")),
        }
    }
}

/// An opaque bcrypt credential hash.
///
/// The plaintext never leaves the aggregate method that hashed it; this
/// type cannot be constructed from anything that does not look like a
/// bcrypt hash, which is also what the codec's field guard enforces on
/// the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a plaintext password.
    pub fn generate(plain: &str) -> Result<Self, bcrypt::BcryptError> {
        Ok(Self(bcrypt::hash(plain, bcrypt::DEFAULT_COST)?))
    }

    /// Accept an already-computed hash, rejecting anything that is not
    /// in bcrypt's `$2*$` format.
    pub fn from_hash(hash: &str) -> Option<Self> {
        Self::looks_hashed(hash).then(|| Self(hash.to_string()))
    }

    pub fn looks_hashed(value: &str) -> bool {
        value.starts_with("$2")
    }

    pub fn verify(&self, plain: &str) -> Result<bool, bcrypt::BcryptError> {
        bcrypt::verify(plain, &self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

impl Serialize for PasswordHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PasswordHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        PasswordHash::from_hash(&value)
            .ok_or_else(|| D::Error::custom("credential field must be a bcrypt hash"))
    }
}
