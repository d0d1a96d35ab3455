use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use crate::metrics::Metrics;

// ============================================================================
// Event Bus - In-Process Publish/Subscribe Keyed by Event Name
// ============================================================================
//
// Decouples the aggregate/event-store write path from projections and
// notification side effects. Delivery is synchronous and in subscription
// order, which preserves per-aggregate version ordering because publish
// happens right after a single append call completes.
//
// Delivery is at-least-once and best-effort: a handler failure is caught
// and logged, never rolled back into the already-committed append and
// never allowed to block other handlers. A failed projection leaves its
// read model stale until reprocessed.
//
// ============================================================================

/// Handler invoked with the decoded typed event for every published
/// event carrying a subscribed name.
pub type EventHandler<M> = Arc<dyn Fn(M) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Box an async closure into an [`EventHandler`].
pub fn handler<M, F, Fut>(f: F) -> EventHandler<M>
where
    F: Fn(M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |message| Box::pin(f(message)))
}

struct Subscriber<M> {
    name: String,
    handler: EventHandler<M>,
}

impl<M> Clone for Subscriber<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// In-process pub/sub router from event name to handlers.
///
/// Subscriptions are registered at startup; the routing table is
/// read-mostly afterwards.
pub struct EventBus<M> {
    subscribers: RwLock<HashMap<String, Vec<Subscriber<M>>>>,
    metrics: Option<Arc<Metrics>>,
}

impl<M: Clone + Send + Sync + 'static> EventBus<M> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register `handler` for every published event named `event_name`.
    /// `handler_name` identifies the subscriber in logs and metrics.
    pub async fn subscribe(
        &self,
        event_name: impl Into<String>,
        handler_name: impl Into<String>,
        handler: EventHandler<M>,
    ) {
        let event_name = event_name.into();
        let subscriber = Subscriber {
            name: handler_name.into(),
            handler,
        };

        let mut subscribers = self.subscribers.write().await;
        subscribers.entry(event_name).or_default().push(subscriber);
    }

    /// Invoke every subscribed handler for `event_name`, synchronously,
    /// in subscription order. No subscribers is a no-op.
    pub async fn publish(&self, event_name: &str, message: M) {
        let handlers = {
            let subscribers = self.subscribers.read().await;
            subscribers.get(event_name).cloned()
        };

        let Some(handlers) = handlers else {
            tracing::debug!(event_name, "published event has no subscribers");
            return;
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_publish(event_name);
        }

        for subscriber in handlers {
            if let Err(error) = (subscriber.handler)(message.clone()).await {
                // Deliberately swallowed: the append already committed,
                // and one broken subscriber must not block the rest.
                tracing::error!(
                    event_name,
                    handler = %subscriber.name,
                    %error,
                    "event handler failed"
                );

                if let Some(metrics) = &self.metrics {
                    metrics.record_handler_failure(event_name, &subscriber.name);
                }
            }
        }
    }
}

impl<M: Clone + Send + Sync + 'static> Default for EventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_handler(
        log: Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> EventHandler<String> {
        handler(move |message: String| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{tag}:{message}"));
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus: EventBus<String> = EventBus::new();
        bus.publish("DeviceCreated", "dev-1".to_string()).await;
    }

    #[tokio::test]
    async fn handlers_run_in_subscription_order() {
        let bus: EventBus<String> = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("DeviceCreated", "first", recording_handler(Arc::clone(&log), "a"))
            .await;
        bus.subscribe("DeviceCreated", "second", recording_handler(Arc::clone(&log), "b"))
            .await;

        bus.publish("DeviceCreated", "dev-1".to_string()).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:dev-1".to_string(), "b:dev-1".to_string()]
        );
    }

    #[tokio::test]
    async fn handlers_only_receive_their_subscribed_name() {
        let bus: EventBus<String> = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("DeviceCreated", "devices", recording_handler(Arc::clone(&log), "a"))
            .await;

        bus.publish("UserCreated", "someone".to_string()).await;
        assert!(log.lock().unwrap().is_empty());

        bus.publish("DeviceCreated", "dev-1".to_string()).await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_later_handlers() {
        let bus: EventBus<String> = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "DeviceRemoved",
            "broken",
            handler(|_message: String| async { anyhow::bail!("projection store offline") }),
        )
        .await;
        bus.subscribe("DeviceRemoved", "intact", recording_handler(Arc::clone(&log), "b"))
            .await;

        bus.publish("DeviceRemoved", "dev-1".to_string()).await;

        assert_eq!(*log.lock().unwrap(), vec!["b:dev-1".to_string()]);
    }
}
