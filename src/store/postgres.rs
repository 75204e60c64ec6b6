use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use crate::error::AppError;

use super::{EventFilter, EventTypeCount, NewEvent, PageMeta, PageResult, Pagination};
use super::Event;

/// C1: append-only event store backed by Postgres.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(25)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("failed to connect to postgres")?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS behavior_events (
                event_id UUID PRIMARY KEY,
                session_id TEXT NOT NULL,
                user_id TEXT,
                user_name TEXT,
                timestamp TIMESTAMPTZ NOT NULL,
                event_type TEXT NOT NULL,
                url TEXT NOT NULL,
                x INTEGER,
                y INTEGER,
                key TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("failed to create behavior_events table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS behavior_events_user_ts_idx \
             ON behavior_events (user_id, timestamp DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS behavior_events_session_idx \
             ON behavior_events (session_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn append(&self, event: NewEvent) -> Result<Event, AppError> {
        let event_id = Uuid::new_v4();
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO behavior_events
                (event_id, session_id, user_id, user_name, timestamp, event_type, url, x, y, key, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
             RETURNING event_id, session_id, user_id, user_name, timestamp, event_type, url, x, y, key, created_at, updated_at",
        )
        .bind(event_id)
        .bind(&event.session_id)
        .bind(&event.user_id)
        .bind(&event.user_name)
        .bind(event.timestamp)
        .bind(&event.event_type)
        .bind(&event.url)
        .bind(event.x)
        .bind(event.y)
        .bind(&event.key)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Store(e.to_string()))?;

        row_to_event(&row)
    }

    /// Atomic all-or-nothing batch insert.
    pub async fn append_batch(&self, events: Vec<NewEvent>) -> Result<Vec<Event>, AppError> {
        if events.is_empty() || events.len() > super::MAX_BATCH_SIZE {
            return Err(AppError::Validation(format!(
                "batch size must be between 1 and {}, got {}",
                super::MAX_BATCH_SIZE,
                events.len()
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        let now = Utc::now();
        let mut inserted = Vec::with_capacity(events.len());

        for event in events {
            let event_id = Uuid::new_v4();
            let row = sqlx::query(
                "INSERT INTO behavior_events
                    (event_id, session_id, user_id, user_name, timestamp, event_type, url, x, y, key, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
                 RETURNING event_id, session_id, user_id, user_name, timestamp, event_type, url, x, y, key, created_at, updated_at",
            )
            .bind(event_id)
            .bind(&event.session_id)
            .bind(&event.user_id)
            .bind(&event.user_name)
            .bind(event.timestamp)
            .bind(&event.event_type)
            .bind(&event.url)
            .bind(event.x)
            .bind(event.y)
            .bind(&event.key)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

            inserted.push(row_to_event(&row)?);
        }

        tx.commit().await.map_err(|e| AppError::Store(e.to_string()))?;
        Ok(inserted)
    }

    pub async fn get(&self, id: Uuid) -> Result<Event, AppError> {
        let row = sqlx::query(
            "SELECT event_id, session_id, user_id, user_name, timestamp, event_type, url, x, y, key, created_at, updated_at
             FROM behavior_events WHERE event_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Store(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("event {id} not found")))?;

        row_to_event(&row)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM behavior_events WHERE event_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("event {id} not found")));
        }
        Ok(())
    }

    pub async fn count(&self, filter: &EventFilter) -> Result<i64, AppError> {
        let (where_clause, binds) = build_where(filter);
        let sql = format!("SELECT COUNT(*)::BIGINT AS count FROM behavior_events {where_clause}");
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = bind.apply(query);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        row.try_get::<i64, _>("count")
            .map_err(|e| AppError::Store(e.to_string()))
    }

    /// Filtered, paginated retrieval, ordered `timestamp DESC, event_id ASC`.
    pub async fn query(
        &self,
        filter: &EventFilter,
        pagination: Pagination,
        limits: super::PaginationLimits,
    ) -> Result<PageResult<Event>, AppError> {
        let (where_clause, binds) = build_where(filter);
        let (offset, limit) = pagination.offset_and_limit(limits);

        let sql = format!(
            "SELECT event_id, session_id, user_id, user_name, timestamp, event_type, url, x, y, key, created_at, updated_at
             FROM behavior_events {where_clause}
             ORDER BY timestamp DESC, event_id ASC
             LIMIT {limit} OFFSET {offset}"
        );
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = bind.apply(query);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        let items = rows
            .iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>, _>>()?;

        let meta = if let Pagination::Page { page, per_page } = pagination {
            let total = self.count(filter).await?;
            let per_page = per_page.clamp(1, limits.max_per_page);
            Some(PageMeta::new(page.max(1), per_page, total))
        } else {
            None
        };

        Ok(PageResult { items, meta })
    }

    pub async fn user_event_type_counts(
        &self,
        user_id: &str,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
    ) -> Result<Vec<EventTypeCount>, AppError> {
        let rows = sqlx::query(
            "SELECT event_type, COUNT(*)::BIGINT AS count
             FROM behavior_events
             WHERE user_id = $1 AND timestamp >= $2 AND timestamp <= $3
             GROUP BY event_type
             ORDER BY count DESC",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Store(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(EventTypeCount {
                    event_type: row
                        .try_get("event_type")
                        .map_err(|e| AppError::Store(e.to_string()))?,
                    count: row.try_get("count").map_err(|e| AppError::Store(e.to_string()))?,
                })
            })
            .collect()
    }

    /// Loads the full set of events matching a filter, unpaginated, for
    /// consumption by the analytics engine (C2–C5). Snapshot-consistent
    /// within this single query.
    pub async fn query_all(&self, filter: &EventFilter) -> Result<Vec<Event>, AppError> {
        let (where_clause, binds) = build_where(filter);
        let sql = format!(
            "SELECT event_id, session_id, user_id, user_name, timestamp, event_type, url, x, y, key, created_at, updated_at
             FROM behavior_events {where_clause}
             ORDER BY timestamp ASC, event_id ASC"
        );
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = bind.apply(query);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        rows.iter().map(row_to_event).collect()
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<Event, AppError> {
    let map = |e: sqlx::Error| AppError::Store(e.to_string());
    Ok(Event {
        event_id: row.try_get("event_id").map_err(map)?,
        session_id: row.try_get("session_id").map_err(map)?,
        user_id: row.try_get("user_id").map_err(map)?,
        user_name: row.try_get("user_name").map_err(map)?,
        timestamp: row.try_get("timestamp").map_err(map)?,
        event_type: row.try_get("event_type").map_err(map)?,
        url: row.try_get("url").map_err(map)?,
        x: row.try_get("x").map_err(map)?,
        y: row.try_get("y").map_err(map)?,
        key: row.try_get("key").map_err(map)?,
        created_at: row.try_get("created_at").map_err(map)?,
        updated_at: row.try_get("updated_at").map_err(map)?,
    })
}

/// A deferred bind value applied in the same order its placeholder was
/// appended to the WHERE clause.
enum Bind {
    Text(String),
    Time(chrono::DateTime<Utc>),
}

impl Bind {
    fn apply<'q>(
        &'q self,
        query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        match self {
            Bind::Text(s) => query.bind(s),
            Bind::Time(t) => query.bind(t),
        }
    }
}

fn build_where(filter: &EventFilter) -> (String, Vec<Bind>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();
    let mut next = 1;

    if let Some(user_id) = &filter.user_id {
        clauses.push(format!("user_id = ${next}"));
        binds.push(Bind::Text(user_id.clone()));
        next += 1;
    }
    if let Some(session_id) = &filter.session_id {
        clauses.push(format!("session_id = ${next}"));
        binds.push(Bind::Text(session_id.clone()));
        next += 1;
    }
    if let Some(event_type) = &filter.event_type {
        clauses.push(format!("event_type = ${next}"));
        binds.push(Bind::Text(event_type.clone()));
        next += 1;
    }
    if let Some(url_contains) = &filter.url_contains {
        clauses.push(format!("url ILIKE ${next}"));
        binds.push(Bind::Text(format!("%{url_contains}%")));
        next += 1;
    }
    if let Some(start) = filter.start_time {
        clauses.push(format!("timestamp >= ${next}"));
        binds.push(Bind::Time(start));
        next += 1;
    }
    if let Some(end) = filter.end_time {
        clauses.push(format!("timestamp <= ${next}"));
        binds.push(Bind::Time(end));
        next += 1;
    }
    let _ = next;

    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), binds)
    }
}
