use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DeviceError;
use super::events::*;
use super::value_objects::{topic_name_for, DeviceStatus};
use crate::event_sourcing::AggregateRoot;

// ============================================================================
// Device Aggregate - Domain Logic
// ============================================================================

/// Result of a device uniqueness lookup.
#[derive(Debug, Clone)]
pub struct DeviceLookupResult {
    pub uid: Uuid,
    pub device_id: String,
}

/// Uniqueness lookup injected into device operations; backed by the
/// device read model.
#[async_trait::async_trait]
pub trait DeviceLookup: Send + Sync {
    /// Find a non-removed device by its external id.
    async fn find_by_device_id(
        &self,
        device_id: &str,
    ) -> anyhow::Result<Option<DeviceLookupResult>>;
}

#[derive(Debug, Clone)]
pub struct Device {
    pub uid: Uuid,
    pub device_id: String,
    pub name: String,
    pub topic_name: String,
    pub status: DeviceStatus,
    pub description: Option<String>,
    pub created_date: DateTime<Utc>,

    // Events
    version: i64,
    uncommitted_events: Vec<DeviceEvent>,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            uid: Uuid::nil(),
            device_id: String::new(),
            name: String::new(),
            topic_name: String::new(),
            status: DeviceStatus::MetadataCreated,
            description: None,
            created_date: DateTime::UNIX_EPOCH,
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }
}

impl Device {
    /// Register a new device. The external id must be unique among
    /// non-removed devices; the MQTT topic name is derived from it.
    pub async fn create(
        lookup: &dyn DeviceLookup,
        device_id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<Self, DeviceError> {
        validate_device_id(device_id)?;
        validate_name(name)?;

        if lookup
            .find_by_device_id(device_id)
            .await
            .map_err(DeviceError::Lookup)?
            .is_some()
        {
            return Err(DeviceError::DeviceIDExists);
        }

        let mut device = Device::default();
        device.track_change(DeviceEvent::Created(DeviceCreated {
            uid: Uuid::new_v4(),
            device_id: device_id.to_string(),
            name: name.to_string(),
            topic_name: topic_name_for(device_id),
            status: DeviceStatus::MetadataCreated,
            description,
            created_date: Utc::now(),
        }));

        Ok(device)
    }

    /// Change the external id; the topic name follows it.
    pub async fn change_id(
        &mut self,
        lookup: &dyn DeviceLookup,
        device_id: &str,
    ) -> Result<(), DeviceError> {
        self.ensure_not_removed()?;
        validate_device_id(device_id)?;

        if let Some(existing) = lookup
            .find_by_device_id(device_id)
            .await
            .map_err(DeviceError::Lookup)?
        {
            if existing.uid != self.uid {
                return Err(DeviceError::DeviceIDExists);
            }
        }

        self.track_change(DeviceEvent::IDChanged(DeviceIDChanged {
            uid: self.uid,
            device_id: device_id.to_string(),
            topic_name: topic_name_for(device_id),
        }));

        Ok(())
    }

    pub fn change_name(&mut self, name: &str) -> Result<(), DeviceError> {
        self.ensure_not_removed()?;
        validate_name(name)?;

        self.track_change(DeviceEvent::NameChanged(DeviceNameChanged {
            uid: self.uid,
            name: name.to_string(),
        }));

        Ok(())
    }

    pub fn change_description(&mut self, description: &str) -> Result<(), DeviceError> {
        self.ensure_not_removed()?;

        self.track_change(DeviceEvent::DescriptionChanged(DeviceDescriptionChanged {
            uid: self.uid,
            description: description.to_string(),
        }));

        Ok(())
    }

    pub fn change_status(&mut self, status: DeviceStatus) -> Result<(), DeviceError> {
        self.ensure_not_removed()?;

        self.track_change(DeviceEvent::StatusChanged(DeviceStatusChanged {
            uid: self.uid,
            status,
        }));

        Ok(())
    }

    pub fn remove(&mut self) -> Result<(), DeviceError> {
        self.ensure_not_removed()?;

        self.track_change(DeviceEvent::Removed(DeviceRemoved { uid: self.uid }));

        Ok(())
    }

    fn ensure_not_removed(&self) -> Result<(), DeviceError> {
        if self.status == DeviceStatus::Removed {
            return Err(DeviceError::AlreadyRemoved);
        }
        Ok(())
    }
}

fn validate_device_id(device_id: &str) -> Result<(), DeviceError> {
    if device_id.trim().is_empty() {
        return Err(DeviceError::DeviceIDEmpty);
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), DeviceError> {
    if name.trim().is_empty() {
        return Err(DeviceError::NameEmpty);
    }
    Ok(())
}

impl AggregateRoot for Device {
    type Event = DeviceEvent;
    type Error = DeviceError;

    fn aggregate_id(&self) -> Uuid {
        self.uid
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[DeviceEvent] {
        &self.uncommitted_events
    }

    fn uncommitted_events_mut(&mut self) -> &mut Vec<DeviceEvent> {
        &mut self.uncommitted_events
    }

    fn transition(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Created(e) => {
                self.uid = e.uid;
                self.device_id = e.device_id.clone();
                self.name = e.name.clone();
                self.topic_name = e.topic_name.clone();
                self.status = e.status;
                self.description = e.description.clone();
                self.created_date = e.created_date;
            }
            DeviceEvent::IDChanged(e) => {
                self.device_id = e.device_id.clone();
                self.topic_name = e.topic_name.clone();
            }
            DeviceEvent::NameChanged(e) => {
                self.name = e.name.clone();
            }
            DeviceEvent::DescriptionChanged(e) => {
                self.description = Some(e.description.clone());
            }
            DeviceEvent::StatusChanged(e) => {
                self.status = e.status;
            }
            DeviceEvent::Removed(_) => {
                self.status = DeviceStatus::Removed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::{DomainEvent, StoredEvent};

    /// Lookup stub reporting a fixed set of taken device ids.
    struct StubLookup {
        taken: Vec<DeviceLookupResult>,
    }

    impl StubLookup {
        fn empty() -> Self {
            Self { taken: Vec::new() }
        }

        fn with(uid: Uuid, device_id: &str) -> Self {
            Self {
                taken: vec![DeviceLookupResult {
                    uid,
                    device_id: device_id.to_string(),
                }],
            }
        }
    }

    #[async_trait::async_trait]
    impl DeviceLookup for StubLookup {
        async fn find_by_device_id(
            &self,
            device_id: &str,
        ) -> anyhow::Result<Option<DeviceLookupResult>> {
            Ok(self
                .taken
                .iter()
                .find(|entry| entry.device_id == device_id)
                .cloned())
        }
    }

    struct FailingLookup;

    #[async_trait::async_trait]
    impl DeviceLookup for FailingLookup {
        async fn find_by_device_id(
            &self,
            _device_id: &str,
        ) -> anyhow::Result<Option<DeviceLookupResult>> {
            anyhow::bail!("read store unavailable")
        }
    }

    #[tokio::test]
    async fn create_device_records_a_single_created_event() {
        let device = Device::create(&StubLookup::empty(), "dev-1", "Sensor A", None)
            .await
            .unwrap();

        assert_eq!(device.device_id, "dev-1");
        assert_eq!(device.name, "Sensor A");
        assert_eq!(device.topic_name, "topic-dev-1");
        assert_eq!(device.status, DeviceStatus::MetadataCreated);
        assert_eq!(device.version(), 0);

        let uncommitted = device.uncommitted_events();
        assert_eq!(uncommitted.len(), 1);
        assert_eq!(uncommitted[0].event_name(), "DeviceCreated");
    }

    #[tokio::test]
    async fn create_device_rejects_taken_device_id() {
        let lookup = StubLookup::with(Uuid::new_v4(), "dev-1");

        let err = Device::create(&lookup, "dev-1", "Sensor A", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::DeviceIDExists));
    }

    #[tokio::test]
    async fn create_device_rejects_empty_inputs() {
        let err = Device::create(&StubLookup::empty(), "", "Sensor A", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::DeviceIDEmpty));

        let err = Device::create(&StubLookup::empty(), "dev-1", "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::NameEmpty));
    }

    #[tokio::test]
    async fn create_device_propagates_lookup_failure() {
        let err = Device::create(&FailingLookup, "dev-1", "Sensor A", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Lookup(_)));
    }

    #[tokio::test]
    async fn change_id_allows_reclaiming_own_id() {
        let mut device = Device::create(&StubLookup::empty(), "dev-1", "Sensor A", None)
            .await
            .unwrap();

        // The read model already knows this device under its own id.
        let lookup = StubLookup::with(device.uid, "dev-1");
        device.change_id(&lookup, "dev-1").await.unwrap();

        assert_eq!(device.device_id, "dev-1");
        assert_eq!(device.uncommitted_events().len(), 2);
    }

    #[tokio::test]
    async fn change_id_rejects_id_taken_by_another_device() {
        let mut device = Device::create(&StubLookup::empty(), "dev-1", "Sensor A", None)
            .await
            .unwrap();

        let lookup = StubLookup::with(Uuid::new_v4(), "dev-2");
        let err = device.change_id(&lookup, "dev-2").await.unwrap_err();
        assert!(matches!(err, DeviceError::DeviceIDExists));
    }

    #[tokio::test]
    async fn failed_validation_leaves_state_and_uncommitted_list_unchanged() {
        let mut device = Device::create(&StubLookup::empty(), "dev-1", "Sensor A", None)
            .await
            .unwrap();

        let err = device.change_name("").unwrap_err();
        assert!(matches!(err, DeviceError::NameEmpty));
        assert_eq!(device.name, "Sensor A");
        assert_eq!(device.uncommitted_events().len(), 1);
    }

    #[tokio::test]
    async fn removed_device_rejects_further_mutation() {
        let mut device = Device::create(&StubLookup::empty(), "dev-1", "Sensor A", None)
            .await
            .unwrap();

        device.remove().unwrap();
        assert_eq!(device.status, DeviceStatus::Removed);

        let err = device.change_name("Sensor B").unwrap_err();
        assert!(matches!(err, DeviceError::AlreadyRemoved));

        let err = device.remove().unwrap_err();
        assert!(matches!(err, DeviceError::AlreadyRemoved));
    }

    #[tokio::test]
    async fn change_status_applies_immediately() {
        let mut device = Device::create(&StubLookup::empty(), "dev-1", "Sensor A", None)
            .await
            .unwrap();

        device.change_status(DeviceStatus::NodeRedCreated).unwrap();
        assert_eq!(device.status, DeviceStatus::NodeRedCreated);
        assert_eq!(device.uncommitted_events().len(), 2);
    }

    fn history_from(events: Vec<DeviceEvent>) -> Vec<StoredEvent<DeviceEvent>> {
        let uid = match &events[0] {
            DeviceEvent::Created(e) => e.uid,
            _ => panic!("history must start with DeviceCreated"),
        };

        events
            .into_iter()
            .enumerate()
            .map(|(i, event)| StoredEvent {
                aggregate_uid: uid,
                version: (i + 1) as i64,
                created_date: Utc::now(),
                event,
            })
            .collect()
    }

    #[tokio::test]
    async fn replay_reproduces_state_deterministically() {
        let mut device = Device::create(&StubLookup::empty(), "dev-1", "Sensor A", None)
            .await
            .unwrap();
        device.change_name("Sensor B").unwrap();
        device.change_status(DeviceStatus::Removed).unwrap();

        let history = history_from(device.take_uncommitted_events());

        let first = Device::load_from_history(&history);
        let second = Device::load_from_history(&history);

        assert_eq!(first.uid, device.uid);
        assert_eq!(first.name, "Sensor B");
        assert_eq!(first.status, DeviceStatus::Removed);
        assert_eq!(first.version(), 3);

        assert_eq!(first.uid, second.uid);
        assert_eq!(first.name, second.name);
        assert_eq!(first.status, second.status);
        assert_eq!(first.version(), second.version());
        assert!(first.uncommitted_events().is_empty());
    }

    #[tokio::test]
    async fn replayed_aggregate_accepts_further_commands() {
        let mut device = Device::create(&StubLookup::empty(), "dev-1", "Sensor A", None)
            .await
            .unwrap();

        let history = history_from(device.take_uncommitted_events());
        let mut rehydrated = Device::load_from_history(&history);

        rehydrated.change_status(DeviceStatus::Removed).unwrap();
        assert_eq!(rehydrated.status, DeviceStatus::Removed);
        assert_eq!(rehydrated.version(), 1);
        assert_eq!(rehydrated.uncommitted_events().len(), 1);
        assert_eq!(
            rehydrated.uncommitted_events()[0].event_name(),
            "DeviceStatusChanged"
        );
    }
}
