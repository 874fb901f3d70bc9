use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::store::{ReadingStore, StatusStore, StorageError};
use crate::telemetry::{Channel, ChannelStatus, Reading, StatusSnapshot};

pub async fn new_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to database")
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!()
        .run(pool)
        .await
        .context("failed to run database migrations")
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn reading_from_row(row: &PgRow) -> Result<Reading, StorageError> {
    Ok(Reading {
        date: row.try_get("date")?,
        time: row.try_get("time")?,
        water_temperature: row.try_get("water_temperature")?,
        tds: row.try_get("tds")?,
        humidity: row.try_get("humidity")?,
        environment_temperature: row.try_get("environment_temperature")?,
        water_level: row.try_get("water_level")?,
        ph: row.try_get("ph")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

fn status_from_row(row: &PgRow) -> Result<StatusSnapshot, StorageError> {
    let captured_at: DateTime<Utc> = row.try_get("captured_at")?;

    let mut columns = Vec::with_capacity(Channel::ALL.len());
    for channel in Channel::ALL {
        columns.push((channel, row.try_get::<String, _>(channel.column())?));
    }

    snapshot_from_columns(captured_at, columns)
}

/// Builds a snapshot from the stored per-channel status text.
fn snapshot_from_columns(
    captured_at: DateTime<Utc>,
    columns: impl IntoIterator<Item = (Channel, String)>,
) -> Result<StatusSnapshot, StorageError> {
    let mut statuses = IndexMap::with_capacity(Channel::ALL.len());
    for (channel, raw) in columns {
        let status = raw
            .parse::<ChannelStatus>()
            .map_err(|e| StorageError::InvalidRow {
                table: "status_snapshots",
                detail: format!("{}: {e}", channel.column()),
            })?;
        statuses.insert(channel, status);
    }

    Ok(StatusSnapshot {
        captured_at,
        statuses,
    })
}

const SELECT_READINGS: &str = r#"
    SELECT date, time, water_temperature, tds, humidity, environment_temperature, water_level, ph, recorded_at
    FROM readings
    ORDER BY recorded_at DESC, id DESC
    LIMIT $1
"#;

const SELECT_STATUSES: &str = r#"
    SELECT captured_at, water_temperature, tds, humidity, environment_temperature, water_level, ph
    FROM status_snapshots
    ORDER BY captured_at DESC, id DESC
    LIMIT $1
"#;

impl ReadingStore for PgPool {
    async fn save_reading(&self, reading: &Reading) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO readings (date, time, water_temperature, tds, humidity, environment_temperature, water_level, ph, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&reading.date)
        .bind(&reading.time)
        .bind(reading.water_temperature)
        .bind(reading.tds)
        .bind(reading.humidity)
        .bind(reading.environment_temperature)
        .bind(reading.water_level)
        .bind(reading.ph)
        .bind(reading.recorded_at)
        .execute(self)
        .await?;

        Ok(())
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StorageError> {
        let row = sqlx::query(SELECT_READINGS)
            .bind(1i64)
            .fetch_optional(self)
            .await?;

        row.as_ref().map(reading_from_row).transpose()
    }

    async fn recent_readings(&self, limit: usize) -> Result<Vec<Reading>, StorageError> {
        let rows = sqlx::query(SELECT_READINGS)
            .bind(limit_param(limit))
            .fetch_all(self)
            .await?;

        rows.iter().map(reading_from_row).collect()
    }
}

impl StatusStore for PgPool {
    async fn save_status(&self, snapshot: &StatusSnapshot) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO status_snapshots (captured_at, water_temperature, tds, humidity, environment_temperature, water_level, ph)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(snapshot.captured_at)
        .bind(snapshot.status(Channel::WaterTemperature).as_str())
        .bind(snapshot.status(Channel::Tds).as_str())
        .bind(snapshot.status(Channel::Humidity).as_str())
        .bind(snapshot.status(Channel::EnvironmentTemperature).as_str())
        .bind(snapshot.status(Channel::WaterLevel).as_str())
        .bind(snapshot.status(Channel::Ph).as_str())
        .execute(self)
        .await?;

        Ok(())
    }

    async fn latest_status(&self) -> Result<Option<StatusSnapshot>, StorageError> {
        let row = sqlx::query(SELECT_STATUSES)
            .bind(1i64)
            .fetch_optional(self)
            .await?;

        row.as_ref().map(status_from_row).transpose()
    }

    async fn recent_statuses(&self, limit: usize) -> Result<Vec<StatusSnapshot>, StorageError> {
        let rows = sqlx::query(SELECT_STATUSES)
            .bind(limit_param(limit))
            .fetch_all(self)
            .await?;

        rows.iter().map(status_from_row).collect()
    }
}
