use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event_sourcing::core::{CodecError, DomainEvent, EventCodec, EventEnvelope};

// ============================================================================
// Event Store - Append-Only, Per-Aggregate, Version-Ordered Log
// ============================================================================
//
// Responsibilities:
// 1. Append events in order, assigning versions expected+1, expected+2, ...
// 2. Reject appends whose expected version no longer matches the stream
//    (compare-and-swap; the caller may retry on VersionConflict)
// 3. Load full histories in ascending version order for replay
//
// The log is the sole source of truth for write-path state. Read models
// exist only for queries, never for re-deriving state.
//
// ============================================================================

/// One durably appended event: the decoded payload plus its stream
/// position metadata.
#[derive(Debug, Clone)]
pub struct StoredEvent<E> {
    pub aggregate_uid: Uuid,
    pub version: i64,
    pub created_date: DateTime<Utc>,
    pub event: E,
}

#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error("version conflict on {aggregate_uid}: expected {expected}, stored {actual}")]
    VersionConflict {
        aggregate_uid: Uuid,
        expected: i64,
        actual: i64,
    },

    #[error("cannot append an empty event batch for {0}")]
    EmptyBatch(Uuid),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("event store database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append-only event log keyed by aggregate id.
#[async_trait::async_trait]
pub trait EventStore<E: DomainEvent>: Send + Sync {
    /// Append `events` after `expected_version`, assigning versions
    /// `expected_version + 1 ..`. All-or-nothing for the batch: either
    /// every event of one command is durably appended, or none are.
    /// Returns the new latest version.
    async fn append(
        &self,
        aggregate_uid: Uuid,
        expected_version: i64,
        events: &[E],
    ) -> Result<i64, EventStoreError>;

    /// Every stored event for the id in strictly ascending version
    /// order. An unknown id yields an empty history, not an error.
    async fn load_all(&self, aggregate_uid: Uuid) -> Result<Vec<StoredEvent<E>>, EventStoreError>;

    /// Latest stored version for the id; 0 for a brand-new aggregate.
    async fn current_version(&self, aggregate_uid: Uuid) -> Result<i64, EventStoreError>;
}

struct StoredRecord {
    version: i64,
    created_date: DateTime<Utc>,
    envelope: EventEnvelope,
}

/// In-memory event store used by tests and single-process deployments.
pub struct InMemoryEventStore<E: 'static> {
    codec: &'static EventCodec<E>,
    streams: RwLock<HashMap<Uuid, Vec<StoredRecord>>>,
}

impl<E: DomainEvent + Serialize> InMemoryEventStore<E> {
    pub fn new(codec: &'static EventCodec<E>) -> Self {
        Self {
            codec,
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a raw envelope, bypassing the codec. Lets tests plant
    /// records that the current registry cannot decode.
    #[cfg(test)]
    pub async fn insert_raw(&self, aggregate_uid: Uuid, version: i64, envelope: EventEnvelope) {
        let mut streams = self.streams.write().await;
        streams.entry(aggregate_uid).or_default().push(StoredRecord {
            version,
            created_date: Utc::now(),
            envelope,
        });
    }
}

#[async_trait::async_trait]
impl<E> EventStore<E> for InMemoryEventStore<E>
where
    E: DomainEvent + Serialize,
{
    async fn append(
        &self,
        aggregate_uid: Uuid,
        expected_version: i64,
        events: &[E],
    ) -> Result<i64, EventStoreError> {
        if events.is_empty() {
            return Err(EventStoreError::EmptyBatch(aggregate_uid));
        }

        // Encode the whole batch before touching the stream so a codec
        // failure leaves nothing half-written.
        let mut envelopes = Vec::with_capacity(events.len());
        for event in events {
            envelopes.push(self.codec.encode(event)?);
        }

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_uid).or_default();

        let actual = stream.last().map_or(0, |record| record.version);
        if actual != expected_version {
            return Err(EventStoreError::VersionConflict {
                aggregate_uid,
                expected: expected_version,
                actual,
            });
        }

        let mut new_version = expected_version;
        for envelope in envelopes {
            new_version += 1;
            stream.push(StoredRecord {
                version: new_version,
                created_date: Utc::now(),
                envelope,
            });
        }

        tracing::debug!(
            aggregate_uid = %aggregate_uid,
            aggregate_type = self.codec.aggregate_type(),
            new_version,
            event_count = events.len(),
            "appended events"
        );

        Ok(new_version)
    }

    async fn load_all(&self, aggregate_uid: Uuid) -> Result<Vec<StoredEvent<E>>, EventStoreError> {
        let streams = self.streams.read().await;
        let Some(stream) = streams.get(&aggregate_uid) else {
            return Ok(Vec::new());
        };

        let mut events = Vec::with_capacity(stream.len());
        for record in stream {
            events.push(StoredEvent {
                aggregate_uid,
                version: record.version,
                created_date: record.created_date,
                event: self.codec.decode(&record.envelope)?,
            });
        }

        Ok(events)
    }

    async fn current_version(&self, aggregate_uid: Uuid) -> Result<i64, EventStoreError> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&aggregate_uid)
            .and_then(|stream| stream.last())
            .map_or(0, |record| record.version))
    }
}
