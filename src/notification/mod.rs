use std::sync::Arc;

use crate::domain::organization::OrganizationEvent;
use crate::domain::user::UserEvent;
use crate::domain::PublishedEvent;
use crate::event_sourcing::{handler, EventBus};

// ============================================================================
// Notification Subscriber
// ============================================================================
//
// Sends the invitation and verification codes out by mail. Actual
// delivery sits behind the Mailer capability; delivery is best-effort
// and a failure never touches the write path.
//
// ============================================================================

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Default mailer: writes the message to the log instead of SMTP.
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(
            sender = %self.sender,
            recipient,
            subject,
            body,
            "✉️  outgoing mail"
        );
        Ok(())
    }
}

pub struct NotificationSubscriber {
    mailer: Arc<dyn Mailer>,
}

impl NotificationSubscriber {
    pub fn new(mailer: Arc<dyn Mailer>) -> Arc<Self> {
        Arc::new(Self { mailer })
    }

    /// Defines which events this subscriber listens to.
    pub async fn register(self: Arc<Self>, bus: &EventBus<PublishedEvent>) {
        for event_name in ["UserCreated", "OrganizationCreated"] {
            let subscriber = Arc::clone(&self);
            bus.subscribe(
                event_name,
                "code-mailer",
                handler(move |event| {
                    let subscriber = Arc::clone(&subscriber);
                    async move { subscriber.send_code(event).await }
                }),
            )
            .await;
        }
    }

    async fn send_code(&self, event: PublishedEvent) -> anyhow::Result<()> {
        match event {
            PublishedEvent::User(UserEvent::Created(e)) => {
                self.mailer
                    .send(
                        &e.email,
                        "Your farm account invitation",
                        &format!("Your invitation code is {}", e.invitation_code),
                    )
                    .await
            }
            PublishedEvent::Organization(OrganizationEvent::Created(e)) => {
                self.mailer
                    .send(
                        &e.email,
                        "Verify your organization",
                        &format!("Your verification code is {}", e.verification_code),
                    )
                    .await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{UserCreated, UserRole, UserStatus};
    use crate::event_sourcing::DomainEvent;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, recipient: &str, _subject: &str, body: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn invitation_mail_carries_the_code() {
        let bus: Arc<EventBus<PublishedEvent>> = Arc::new(EventBus::new());
        let mailer = Arc::new(RecordingMailer::default());
        let subscriber = NotificationSubscriber::new(mailer.clone() as Arc<dyn Mailer>);
        subscriber.register(&bus).await;

        let event = PublishedEvent::User(UserEvent::Created(UserCreated {
            uid: Uuid::new_v4(),
            email: "farmer@example.com".to_string(),
            password: None,
            organization_uid: Uuid::new_v4(),
            invitation_code: 123_456,
            role: UserRole::User,
            status: UserStatus::PendingConfirmation,
            created_date: Utc::now(),
            last_updated: Utc::now(),
        }));
        bus.publish(event.event_name(), event).await;

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "farmer@example.com");
        assert!(sent[0].1.contains("123456"));
    }
}
