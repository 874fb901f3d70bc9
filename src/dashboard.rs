//! Read-side shapes served to the dashboard.
//!
//! The current status goes through the staleness rule on the way out, so a device that
//! stopped talking shows up as offline even though nothing new was written.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::store::{ReadingStore, StatusStore, StorageError};
use crate::telemetry::{Channel, ChannelStatus, Reading, StatusSnapshot, evaluate};

pub const DEFAULT_HISTORY_LIMIT: usize = 24;

const CHART_TIME_FORMAT: &str = "%H:%M";
const STATUS_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub water_temperature_status: ChannelStatus,
    pub tds_status: ChannelStatus,
    pub humidity_status: ChannelStatus,
    pub environment_temperature_status: ChannelStatus,
    pub water_level_status: ChannelStatus,
    #[serde(rename = "pHStatus")]
    pub ph_status: ChannelStatus,
    pub captured_at: DateTime<Utc>,
    pub stale: bool,
}

impl StatusReport {
    pub fn new(snapshot: StatusSnapshot, now: DateTime<Utc>, threshold: TimeDelta) -> Self {
        let stale = snapshot.is_stale(now, threshold);
        let snapshot = evaluate(snapshot, now, threshold);

        Self {
            water_temperature_status: snapshot.status(Channel::WaterTemperature),
            tds_status: snapshot.status(Channel::Tds),
            humidity_status: snapshot.status(Channel::Humidity),
            environment_temperature_status: snapshot.status(Channel::EnvironmentTemperature),
            water_level_status: snapshot.status(Channel::WaterLevel),
            ph_status: snapshot.status(Channel::Ph),
            captured_at: snapshot.captured_at,
            stale,
        }
    }
}

/// The latest readings as parallel per-channel series, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub water_temperature: Vec<f64>,
    pub environment_temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub water_level: Vec<f64>,
    pub tds: Vec<f64>,
    pub ph: Vec<f64>,
    pub timestamps: Vec<String>,
}

impl ChartSeries {
    pub fn from_readings(readings: &[Reading], timezone: Tz) -> Self {
        let series = |channel: Channel| readings.iter().map(|r| r.value(channel)).collect();

        Self {
            water_temperature: series(Channel::WaterTemperature),
            environment_temperature: series(Channel::EnvironmentTemperature),
            humidity: series(Channel::Humidity),
            water_level: series(Channel::WaterLevel),
            tds: series(Channel::Tds),
            ph: series(Channel::Ph),
            timestamps: readings
                .iter()
                .map(|r| {
                    r.recorded_at
                        .with_timezone(&timezone)
                        .format(CHART_TIME_FORMAT)
                        .to_string()
                })
                .collect(),
        }
    }
}

/// Stored snapshots as parallel per-channel series, most recent first.
///
/// These are the statuses as written; the staleness rule only applies to the current status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistory {
    pub water_temperature_status: Vec<ChannelStatus>,
    pub tds_status: Vec<ChannelStatus>,
    pub humidity_status: Vec<ChannelStatus>,
    pub environment_temperature_status: Vec<ChannelStatus>,
    pub water_level_status: Vec<ChannelStatus>,
    pub ph_status: Vec<ChannelStatus>,
    pub status_dates: Vec<String>,
}

impl StatusHistory {
    pub fn from_snapshots(snapshots: &[StatusSnapshot], timezone: Tz) -> Self {
        let series = |channel: Channel| snapshots.iter().map(|s| s.status(channel)).collect();

        Self {
            water_temperature_status: series(Channel::WaterTemperature),
            tds_status: series(Channel::Tds),
            humidity_status: series(Channel::Humidity),
            environment_temperature_status: series(Channel::EnvironmentTemperature),
            water_level_status: series(Channel::WaterLevel),
            ph_status: series(Channel::Ph),
            status_dates: snapshots
                .iter()
                .map(|s| {
                    s.captured_at
                        .with_timezone(&timezone)
                        .format(STATUS_DATE_FORMAT)
                        .to_string()
                })
                .collect(),
        }
    }
}

pub async fn current_status<S: StatusStore>(
    store: &S,
    now: DateTime<Utc>,
    threshold: TimeDelta,
) -> Result<Option<StatusReport>, StorageError> {
    let snapshot = store.latest_status().await?;
    Ok(snapshot.map(|s| StatusReport::new(s, now, threshold)))
}

pub async fn latest_reading<S: ReadingStore>(store: &S) -> Result<Option<Reading>, StorageError> {
    store.latest_reading().await
}

pub async fn chart_series<S: ReadingStore>(
    store: &S,
    limit: usize,
    timezone: Tz,
) -> Result<ChartSeries, StorageError> {
    let readings = store.recent_readings(limit).await?;
    Ok(ChartSeries::from_readings(&readings, timezone))
}

pub async fn status_history<S: StatusStore>(
    store: &S,
    limit: usize,
    timezone: Tz,
) -> Result<StatusHistory, StorageError> {
    let snapshots = store.recent_statuses(limit).await?;
    Ok(StatusHistory::from_snapshots(&snapshots, timezone))
}
