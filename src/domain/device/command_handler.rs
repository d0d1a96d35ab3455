use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::aggregate::{Device, DeviceLookup};
use super::commands::DeviceCommand;
use super::errors::DeviceCommandError;
use super::events::DeviceEvent;
use crate::domain::PublishedEvent;
use crate::event_sourcing::{AggregateRoot, DomainEvent, EventBus, EventStore, EventStoreError};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};

// ============================================================================
// Device Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store → Event Bus
//
// The append happens fully before any publish; a version conflict from a
// racing command is retried from a fresh load.
//
// ============================================================================

pub struct DeviceCommandHandler {
    event_store: Arc<dyn EventStore<DeviceEvent>>,
    bus: Arc<EventBus<PublishedEvent>>,
    lookup: Arc<dyn DeviceLookup>,
    retry: RetryConfig,
    metrics: Option<Arc<Metrics>>,
}

impl DeviceCommandHandler {
    pub fn new(
        event_store: Arc<dyn EventStore<DeviceEvent>>,
        bus: Arc<EventBus<PublishedEvent>>,
        lookup: Arc<dyn DeviceLookup>,
    ) -> Self {
        Self {
            event_store,
            bus,
            lookup,
            retry: RetryConfig::conservative(),
            metrics: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Handle a command and persist + publish the resulting events.
    /// Returns the device uid and its new version.
    pub async fn handle(
        &self,
        command: DeviceCommand,
    ) -> Result<(Uuid, i64), DeviceCommandError> {
        let started = Instant::now();

        let result = retry_on_transient(self.retry.clone(), |_attempt| {
            self.execute(command.clone())
        })
        .await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_command("Device", started.elapsed().as_secs_f64());
        }

        match result {
            RetryResult::Success(outcome) => Ok(outcome),
            RetryResult::Failed(error) | RetryResult::PermanentFailure(error) => Err(error),
        }
    }

    async fn execute(&self, command: DeviceCommand) -> Result<(Uuid, i64), DeviceCommandError> {
        let mut device = match command {
            DeviceCommand::Create {
                device_id,
                name,
                description,
            } => Device::create(self.lookup.as_ref(), &device_id, &name, description).await?,
            DeviceCommand::ChangeID { uid, device_id } => {
                let mut device = self.load(uid).await?;
                device.change_id(self.lookup.as_ref(), &device_id).await?;
                device
            }
            DeviceCommand::ChangeName { uid, name } => {
                let mut device = self.load(uid).await?;
                device.change_name(&name)?;
                device
            }
            DeviceCommand::ChangeDescription { uid, description } => {
                let mut device = self.load(uid).await?;
                device.change_description(&description)?;
                device
            }
            DeviceCommand::ChangeStatus { uid, status } => {
                let mut device = self.load(uid).await?;
                device.change_status(status)?;
                device
            }
            DeviceCommand::Remove { uid } => {
                let mut device = self.load(uid).await?;
                device.remove()?;
                device
            }
        };

        let uid = device.aggregate_id();
        let expected_version = device.version();
        let events = device.take_uncommitted_events();

        let new_version = match self
            .event_store
            .append(uid, expected_version, &events)
            .await
        {
            Ok(version) => version,
            Err(error) => {
                if let (Some(metrics), EventStoreError::VersionConflict { .. }) =
                    (&self.metrics, &error)
                {
                    metrics.record_version_conflict("Device");
                }
                return Err(error.into());
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_append("Device", events.len());
        }

        for event in events {
            self.bus
                .publish(event.event_name(), PublishedEvent::Device(event))
                .await;
        }

        Ok((uid, new_version))
    }

    async fn load(&self, uid: Uuid) -> Result<Device, DeviceCommandError> {
        let history = self.event_store.load_all(uid).await?;
        if history.is_empty() {
            return Err(DeviceCommandError::NotFound(uid));
        }

        Ok(Device::load_from_history(&history))
    }
}
