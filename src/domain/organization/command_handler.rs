use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::aggregate::{Organization, OrganizationLookup};
use super::commands::OrganizationCommand;
use super::errors::OrganizationCommandError;
use super::events::OrganizationEvent;
use crate::domain::PublishedEvent;
use crate::event_sourcing::{AggregateRoot, DomainEvent, EventBus, EventStore, EventStoreError};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};

// ============================================================================
// Organization Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store → Event Bus
//
// ============================================================================

pub struct OrganizationCommandHandler {
    event_store: Arc<dyn EventStore<OrganizationEvent>>,
    bus: Arc<EventBus<PublishedEvent>>,
    lookup: Arc<dyn OrganizationLookup>,
    retry: RetryConfig,
    metrics: Option<Arc<Metrics>>,
}

impl OrganizationCommandHandler {
    pub fn new(
        event_store: Arc<dyn EventStore<OrganizationEvent>>,
        bus: Arc<EventBus<PublishedEvent>>,
        lookup: Arc<dyn OrganizationLookup>,
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
    /// Returns the organization uid and its new version.
    pub async fn handle(
        &self,
        command: OrganizationCommand,
    ) -> Result<(Uuid, i64), OrganizationCommandError> {
        let started = Instant::now();

        let result = retry_on_transient(self.retry.clone(), |_attempt| {
            self.execute(command.clone())
        })
        .await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_command("Organization", started.elapsed().as_secs_f64());
        }

        match result {
            RetryResult::Success(outcome) => Ok(outcome),
            RetryResult::Failed(error) | RetryResult::PermanentFailure(error) => Err(error),
        }
    }

    async fn execute(
        &self,
        command: OrganizationCommand,
    ) -> Result<(Uuid, i64), OrganizationCommandError> {
        let mut org = match command {
            OrganizationCommand::Create { name, email } => {
                Organization::create(self.lookup.as_ref(), &name, &email).await?
            }
            OrganizationCommand::ChangeName { uid, name } => {
                let mut org = self.load(uid).await?;
                org.change_name(&name)?;
                org
            }
            OrganizationCommand::ChangeProfile { uid, name, profile } => {
                let mut org = self.load(uid).await?;
                org.change_profile(&name, profile)?;
                org
            }
            OrganizationCommand::Verify { uid } => {
                let mut org = self.load(uid).await?;
                org.verify()?;
                org
            }
        };

        let uid = org.aggregate_id();
        let expected_version = org.version();
        let events = org.take_uncommitted_events();

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
                    metrics.record_version_conflict("Organization");
                }
                return Err(error.into());
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_append("Organization", events.len());
        }

        for event in events {
            self.bus
                .publish(event.event_name(), PublishedEvent::Organization(event))
                .await;
        }

        Ok((uid, new_version))
    }

    async fn load(&self, uid: Uuid) -> Result<Organization, OrganizationCommandError> {
        let history = self.event_store.load_all(uid).await?;
        if history.is_empty() {
            return Err(OrganizationCommandError::NotFound(uid));
        }

        Ok(Organization::load_from_history(&history))
    }
}
