use std::fmt;
use std::str::FromStr;

use anyhow::{Error, bail};
use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::telemetry::{Channel, PartialReading};

/// Snapshots older than this are reported fully offline when read back.
pub const STALENESS_THRESHOLD: TimeDelta = TimeDelta::minutes(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelStatus {
    Online,
    Offline,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Online => "Online",
            ChannelStatus::Offline => "Offline",
        }
    }

    /// `Offline` for zero or NaN, `Online` for anything else.
    pub fn from_value(value: f64) -> Self {
        if value == 0.0 || value.is_nan() {
            ChannelStatus::Offline
        } else {
            ChannelStatus::Online
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Online" => Ok(ChannelStatus::Online),
            "Offline" => Ok(ChannelStatus::Offline),
            _ => bail!("unknown channel status: {}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub captured_at: DateTime<Utc>,

    pub statuses: IndexMap<Channel, ChannelStatus>,
}

impl StatusSnapshot {
    /// Missing channels read as `Offline`.
    pub fn status(&self, channel: Channel) -> ChannelStatus {
        self.statuses
            .get(&channel)
            .copied()
            .unwrap_or(ChannelStatus::Offline)
    }

    pub fn is_stale(&self, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
        now - self.captured_at > threshold
    }

    pub fn all_offline(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|&c| self.status(c) == ChannelStatus::Offline)
    }
}

pub fn derive_statuses(current: &PartialReading, captured_at: DateTime<Utc>) -> StatusSnapshot {
    let statuses = Channel::ALL
        .iter()
        .map(|&c| (c, ChannelStatus::from_value(current.value(c))))
        .collect();

    StatusSnapshot {
        captured_at,
        statuses,
    }
}

/// Applies the staleness rule to a stored snapshot at read time.
///
/// A snapshot captured more than `threshold` before `now` comes back with every channel
/// `Offline`. Anything fresher is returned as is.
pub fn evaluate(
    snapshot: StatusSnapshot,
    now: DateTime<Utc>,
    threshold: TimeDelta,
) -> StatusSnapshot {
    if !snapshot.is_stale(now, threshold) {
        return snapshot;
    }

    StatusSnapshot {
        captured_at: snapshot.captured_at,
        statuses: Channel::ALL
            .iter()
            .map(|&c| (c, ChannelStatus::Offline))
            .collect(),
    }
}
