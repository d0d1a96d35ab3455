use serde::{Deserialize, Serialize};

// ============================================================================
// Organization Value Objects
// ============================================================================

/// Verification status of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationStatus {
    #[serde(rename = "PENDING_CONFIRMATION")]
    PendingConfirmation,
    #[serde(rename = "CONFIRMED")]
    Confirmed,
}

impl OrganizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationStatus::PendingConfirmation => "PENDING_CONFIRMATION",
            OrganizationStatus::Confirmed => "CONFIRMED",
        }
    }
}

impl std::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrganizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_CONFIRMATION" => Ok(OrganizationStatus::PendingConfirmation),
            "CONFIRMED" => Ok(OrganizationStatus::Confirmed),
            other => Err(format!("unknown organization status: {other}")),
        }
    }
}

/// Descriptive profile fields an organization can fill in after signup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub org_type: Option<String>,
    pub total_member: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_wire_strings() {
        let json = serde_json::to_string(&OrganizationStatus::PendingConfirmation).unwrap();
        assert_eq!(json, "\"PENDING_CONFIRMATION\"");

        let parsed: OrganizationStatus = serde_json::from_str("\"CONFIRMED\"").unwrap();
        assert_eq!(parsed, OrganizationStatus::Confirmed);
    }
}
