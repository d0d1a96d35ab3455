use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use super::event_store::{EventStore, EventStoreError, StoredEvent};
use crate::event_sourcing::core::{DomainEvent, EventCodec, EventEnvelope};

// ============================================================================
// PostgreSQL Event Store
// ============================================================================
//
// One events table per aggregate kind, each row holding the encoded
// envelope as JSON text:
//
//   (aggregate_uid, version, created_date, event)
//
// The UNIQUE (aggregate_uid, version) constraint backs the gap-free
// ordering invariant at the database level; the advisory lock serializes
// concurrent appends to one aggregate so the version check and the
// inserts happen atomically.
//
// ============================================================================

pub struct PostgresEventStore<E: 'static> {
    pool: PgPool,
    table: &'static str,
    codec: &'static EventCodec<E>,
}

impl<E: DomainEvent + Serialize> PostgresEventStore<E> {
    pub fn new(pool: PgPool, table: &'static str, codec: &'static EventCodec<E>) -> Self {
        Self { pool, table, codec }
    }

    /// Create the events table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), EventStoreError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                aggregate_uid UUID NOT NULL,
                version BIGINT NOT NULL,
                created_date TIMESTAMPTZ NOT NULL,
                event TEXT NOT NULL,
                UNIQUE (aggregate_uid, version)
            )",
            table = self.table
        );

        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<E> EventStore<E> for PostgresEventStore<E>
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

        let mut payloads = Vec::with_capacity(events.len());
        for event in events {
            let envelope = self.codec.encode(event)?;
            payloads.push(serde_json::to_string(&envelope).map_err(|e| {
                EventStoreError::Codec(crate::event_sourcing::core::CodecError::Serialize(e))
            })?);
        }

        let mut tx = self.pool.begin().await?;

        // Serialize appends per aggregate for the duration of the
        // transaction.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(aggregate_uid)
            .execute(&mut *tx)
            .await?;

        let actual: i64 = sqlx::query_scalar(&format!(
            "SELECT COALESCE(MAX(version), 0) FROM {table} WHERE aggregate_uid = $1",
            table = self.table
        ))
        .bind(aggregate_uid)
        .fetch_one(&mut *tx)
        .await?;

        if actual != expected_version {
            return Err(EventStoreError::VersionConflict {
                aggregate_uid,
                expected: expected_version,
                actual,
            });
        }

        let insert = format!(
            "INSERT INTO {table} (aggregate_uid, version, created_date, event)
             VALUES ($1, $2, $3, $4)",
            table = self.table
        );

        let mut new_version = expected_version;
        for payload in payloads {
            new_version += 1;
            sqlx::query(&insert)
                .bind(aggregate_uid)
                .bind(new_version)
                .bind(Utc::now())
                .bind(payload)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            aggregate_uid = %aggregate_uid,
            aggregate_type = self.codec.aggregate_type(),
            new_version,
            event_count = events.len(),
            "appended events"
        );

        Ok(new_version)
    }

    async fn load_all(&self, aggregate_uid: Uuid) -> Result<Vec<StoredEvent<E>>, EventStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT version, created_date, event FROM {table}
             WHERE aggregate_uid = $1 ORDER BY version ASC",
            table = self.table
        ))
        .bind(aggregate_uid)
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let version: i64 = row.try_get("version")?;
            let created_date: DateTime<Utc> = row.try_get("created_date")?;
            let payload: String = row.try_get("event")?;

            let envelope: EventEnvelope = serde_json::from_str(&payload).map_err(|e| {
                EventStoreError::Codec(crate::event_sourcing::core::CodecError::Serialize(e))
            })?;

            events.push(StoredEvent {
                aggregate_uid,
                version,
                created_date,
                event: self.codec.decode(&envelope)?,
            });
        }

        Ok(events)
    }

    async fn current_version(&self, aggregate_uid: Uuid) -> Result<i64, EventStoreError> {
        let version: i64 = sqlx::query_scalar(&format!(
            "SELECT COALESCE(MAX(version), 0) FROM {table} WHERE aggregate_uid = $1",
            table = self.table
        ))
        .bind(aggregate_uid)
        .fetch_one(&self.pool)
        .await?;

        Ok(version)
    }
}

// Database-backed behavior (append atomicity, conflict detection under
// real concurrency, ordering on load) is exercised against a running
// PostgreSQL instance; the in-memory store covers the contract in unit
// tests.
