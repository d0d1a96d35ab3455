use serde::{Deserialize, Serialize};

// ============================================================================
// Device Value Objects
// ============================================================================

/// Lifecycle status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    #[serde(rename = "METADATA_CREATED")]
    MetadataCreated,
    #[serde(rename = "METADATA_UPDATED")]
    MetadataUpdated,
    #[serde(rename = "NODERED_CREATED")]
    NodeRedCreated,
    #[serde(rename = "REMOVED")]
    Removed,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::MetadataCreated => "METADATA_CREATED",
            DeviceStatus::MetadataUpdated => "METADATA_UPDATED",
            DeviceStatus::NodeRedCreated => "NODERED_CREATED",
            DeviceStatus::Removed => "REMOVED",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "METADATA_CREATED" => Ok(DeviceStatus::MetadataCreated),
            "METADATA_UPDATED" => Ok(DeviceStatus::MetadataUpdated),
            "NODERED_CREATED" => Ok(DeviceStatus::NodeRedCreated),
            "REMOVED" => Ok(DeviceStatus::Removed),
            other => Err(format!("unknown device status: {other}")),
        }
    }
}

/// MQTT topic a device publishes on, derived from its external id.
pub fn topic_name_for(device_id: &str) -> String {
    format!("topic-{device_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_wire_strings() {
        let json = serde_json::to_string(&DeviceStatus::MetadataCreated).unwrap();
        assert_eq!(json, "\"METADATA_CREATED\"");

        let parsed: DeviceStatus = serde_json::from_str("\"REMOVED\"").unwrap();
        assert_eq!(parsed, DeviceStatus::Removed);
    }

    #[test]
    fn status_round_trips_through_from_str() {
        for status in [
            DeviceStatus::MetadataCreated,
            DeviceStatus::MetadataUpdated,
            DeviceStatus::NodeRedCreated,
            DeviceStatus::Removed,
        ] {
            assert_eq!(status.as_str().parse::<DeviceStatus>().unwrap(), status);
        }
    }

    #[test]
    fn topic_name_is_derived_from_device_id() {
        assert_eq!(topic_name_for("dev-1"), "topic-dev-1");
    }
}
