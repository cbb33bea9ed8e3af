// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use jiff::Timestamp;
use sqlx::SqlitePool;

use crate::LocalEvent;
use crate::store::StoreError;

#[derive(Debug, Clone)]
pub struct Events {
    pool: SqlitePool,
}

impl Events {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, event: &EventRecord) -> Result<(), sqlx::Error> {
        const SQL: &str = "\
INSERT INTO events (
    id, title, description, start, end, is_all_day, location, recurrence_rule,
    remote_id, remote_calendar_id, last_pushed_at, last_modified_at, needs_push
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    title              = excluded.title,
    description        = excluded.description,
    start              = excluded.start,
    end                = excluded.end,
    is_all_day         = excluded.is_all_day,
    location           = excluded.location,
    recurrence_rule    = excluded.recurrence_rule,
    remote_id          = excluded.remote_id,
    remote_calendar_id = excluded.remote_calendar_id,
    last_pushed_at     = excluded.last_pushed_at,
    last_modified_at   = excluded.last_modified_at,
    needs_push         = excluded.needs_push;
";

        sqlx::query(SQL)
            .bind(&event.id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.start)
            .bind(&event.end)
            .bind(event.is_all_day)
            .bind(&event.location)
            .bind(&event.recurrence_rule)
            .bind(&event.remote_id)
            .bind(&event.remote_calendar_id)
            .bind(&event.last_pushed_at)
            .bind(&event.last_modified_at)
            .bind(event.needs_push)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<EventRecord>, sqlx::Error> {
        const SQL: &str = "\
SELECT id, title, description, start, end, is_all_day, location, recurrence_rule,
       remote_id, remote_calendar_id, last_pushed_at, last_modified_at, needs_push
FROM events
WHERE id = ?;
";

        sqlx::query_as(SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_remote_id(&self, remote_id: &str) -> Result<Option<EventRecord>, sqlx::Error> {
        const SQL: &str = "\
SELECT id, title, description, start, end, is_all_day, location, recurrence_rule,
       remote_id, remote_calendar_id, last_pushed_at, last_modified_at, needs_push
FROM events
WHERE remote_id = ?
LIMIT 1;
";

        sqlx::query_as(SQL)
            .bind(remote_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<EventRecord>, sqlx::Error> {
        const SQL: &str = "\
SELECT id, title, description, start, end, is_all_day, location, recurrence_rule,
       remote_id, remote_calendar_id, last_pushed_at, last_modified_at, needs_push
FROM events
ORDER BY start ASC;
";

        sqlx::query_as(SQL).fetch_all(&self.pool).await
    }

    pub async fn count_pending_push(&self) -> Result<i64, sqlx::Error> {
        const SQL: &str = "SELECT COUNT(*) FROM events WHERE needs_push = 1;";

        let row: (i64,) = sqlx::query_as(SQL).fetch_one(&self.pool).await?;
        Ok(row.0)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRecord {
    id: String,
    title: String,
    description: Option<String>,
    start: String,
    end: String,
    is_all_day: bool,
    location: Option<String>,
    recurrence_rule: Option<String>,
    remote_id: Option<String>,
    remote_calendar_id: Option<String>,
    last_pushed_at: Option<String>,
    last_modified_at: String,
    needs_push: bool,
}

impl EventRecord {
    pub fn from_event(event: &LocalEvent) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            start: event.start.to_string(),
            end: event.end.to_string(),
            is_all_day: event.is_all_day,
            location: event.location.clone(),
            recurrence_rule: event.recurrence_rule.clone(),
            remote_id: event.remote_id.clone(),
            remote_calendar_id: event.remote_calendar_id.clone(),
            last_pushed_at: event.last_pushed_at.map(|t| t.to_string()),
            last_modified_at: event.last_modified_at.to_string(),
            needs_push: event.needs_push,
        }
    }

    pub fn into_event(self) -> Result<LocalEvent, StoreError> {
        let last_pushed_at = match &self.last_pushed_at {
            Some(t) => Some(parse_timestamp(&self.id, t)?),
            None => None,
        };

        Ok(LocalEvent {
            start: parse_timestamp(&self.id, &self.start)?,
            end: parse_timestamp(&self.id, &self.end)?,
            last_modified_at: parse_timestamp(&self.id, &self.last_modified_at)?,
            last_pushed_at,
            id: self.id,
            title: self.title,
            description: self.description,
            is_all_day: self.is_all_day,
            location: self.location,
            recurrence_rule: self.recurrence_rule,
            remote_id: self.remote_id,
            remote_calendar_id: self.remote_calendar_id,
            needs_push: self.needs_push,
        })
    }
}

fn parse_timestamp(id: &str, value: &str) -> Result<Timestamp, StoreError> {
    value
        .parse()
        .map_err(|e| StoreError::Invalid(format!("bad timestamp {value:?} on event {id}: {e}")))
}
