use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::aggregate::{User, UserLookup};
use super::commands::UserCommand;
use super::errors::UserCommandError;
use super::events::UserEvent;
use crate::domain::PublishedEvent;
use crate::event_sourcing::{AggregateRoot, DomainEvent, EventBus, EventStore, EventStoreError};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};

// ============================================================================
// User Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store → Event Bus
//
// ============================================================================

pub struct UserCommandHandler {
    event_store: Arc<dyn EventStore<UserEvent>>,
    bus: Arc<EventBus<PublishedEvent>>,
    lookup: Arc<dyn UserLookup>,
    retry: RetryConfig,
    metrics: Option<Arc<Metrics>>,
}

impl UserCommandHandler {
    pub fn new(
        event_store: Arc<dyn EventStore<UserEvent>>,
        bus: Arc<EventBus<PublishedEvent>>,
        lookup: Arc<dyn UserLookup>,
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
    /// Returns the user uid and its new version.
    pub async fn handle(&self, command: UserCommand) -> Result<(Uuid, i64), UserCommandError> {
        let started = Instant::now();

        let result = retry_on_transient(self.retry.clone(), |_attempt| {
            self.execute(command.clone())
        })
        .await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_command("User", started.elapsed().as_secs_f64());
        }

        match result {
            RetryResult::Success(outcome) => Ok(outcome),
            RetryResult::Failed(error) | RetryResult::PermanentFailure(error) => Err(error),
        }
    }

    async fn execute(&self, command: UserCommand) -> Result<(Uuid, i64), UserCommandError> {
        let mut user = match command {
            UserCommand::Create {
                organization_uid,
                email,
                role,
            } => User::create(self.lookup.as_ref(), organization_uid, &email, role).await?,
            UserCommand::ChangePassword {
                uid,
                old_password,
                new_password,
                confirm_password,
            } => {
                let mut user = self.load(uid).await?;
                user.change_password(&old_password, &new_password, &confirm_password)?;
                user
            }
            UserCommand::ChangeProfile {
                uid,
                name,
                gender,
                birth_date,
            } => {
                let mut user = self.load(uid).await?;
                user.change_profile(&name, &gender, birth_date)?;
                user
            }
            UserCommand::SetInitialProfile {
                uid,
                name,
                gender,
                birth_date,
                password,
            } => {
                let mut user = self.load(uid).await?;
                user.set_initial_profile(&name, &gender, birth_date, &password)?;
                user
            }
            UserCommand::VerifyInvitation { uid } => {
                let mut user = self.load(uid).await?;
                user.verify_invitation()?;
                user
            }
            UserCommand::RequestResetPassword { uid } => {
                let mut user = self.load(uid).await?;
                user.request_reset_password()?;
                user
            }
            UserCommand::ResetPassword { uid, new_password } => {
                let mut user = self.load(uid).await?;
                user.reset_password(&new_password)?;
                user
            }
        };

        let uid = user.aggregate_id();
        let expected_version = user.version();
        let events = user.take_uncommitted_events();

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
                    metrics.record_version_conflict("User");
                }
                return Err(error.into());
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_append("User", events.len());
        }

        for event in events {
            self.bus
                .publish(event.event_name(), PublishedEvent::User(event))
                .await;
        }

        Ok((uid, new_version))
    }

    /// Validate credentials against the current event-sourced state.
    pub async fn is_password_valid(
        &self,
        uid: Uuid,
        password: &str,
    ) -> Result<bool, UserCommandError> {
        let user = self.load(uid).await?;
        Ok(user.is_password_valid(password)?)
    }

    async fn load(&self, uid: Uuid) -> Result<User, UserCommandError> {
        let history = self.event_store.load_all(uid).await?;
        if history.is_empty() {
            return Err(UserCommandError::NotFound(uid));
        }

        Ok(User::load_from_history(&history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::aggregate::UserLookupResult;
    use crate::domain::user::events;
    use crate::domain::user::value_objects::{UserRole, UserStatus};
    use crate::event_sourcing::InMemoryEventStore;

    struct NoUsers;

    #[async_trait::async_trait]
    impl UserLookup for NoUsers {
        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<UserLookupResult>> {
            Ok(None)
        }
    }

    fn handler() -> UserCommandHandler {
        UserCommandHandler::new(
            Arc::new(InMemoryEventStore::new(events::codec())),
            Arc::new(EventBus::new()),
            Arc::new(NoUsers),
        )
    }

    #[tokio::test]
    async fn invitation_flow_replays_into_a_completed_account() {
        let handler = handler();

        let (uid, version) = handler
            .handle(UserCommand::Create {
                organization_uid: Uuid::new_v4(),
                email: "farmer@example.com".to_string(),
                role: UserRole::User,
            })
            .await
            .unwrap();
        assert_eq!(version, 1);

        handler
            .handle(UserCommand::VerifyInvitation { uid })
            .await
            .unwrap();

        let (_, version) = handler
            .handle(UserCommand::SetInitialProfile {
                uid,
                name: "Jata".to_string(),
                gender: "female".to_string(),
                birth_date: "1990-01-02T00:00:00Z".parse().unwrap(),
                password: "s3cret".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(version, 3);

        let history = handler.event_store.load_all(uid).await.unwrap();
        let user = User::load_from_history(&history);
        assert_eq!(user.status, UserStatus::Completed);

        assert!(handler.is_password_valid(uid, "s3cret").await.unwrap());
    }

    #[tokio::test]
    async fn command_against_unknown_user_is_rejected() {
        let handler = handler();

        let err = handler
            .handle(UserCommand::VerifyInvitation { uid: Uuid::new_v4() })
            .await
            .unwrap_err();
        assert!(matches!(err, UserCommandError::NotFound(_)));
    }
}
