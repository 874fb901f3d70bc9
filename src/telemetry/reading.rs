use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::telemetry::{Channel, Field, FieldError};

/// A fully assembled sample set, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub date: String,

    pub time: String,

    pub water_temperature: f64,

    pub tds: f64,

    pub humidity: f64,

    pub environment_temperature: f64,

    pub water_level: f64,

    pub ph: f64,

    pub recorded_at: DateTime<Utc>,
}

impl Reading {
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::WaterTemperature => self.water_temperature,
            Channel::Tds => self.tds,
            Channel::Humidity => self.humidity,
            Channel::EnvironmentTemperature => self.environment_temperature,
            Channel::WaterLevel => self.water_level,
            Channel::Ph => self.ph,
        }
    }
}

/// The in-progress record the device stream is written into.
///
/// Measurements are `None` until a line for the channel has been seen. A reported value of
/// exactly zero is kept as `Some(0.0)` but still counts as unobserved for completeness and
/// status, matching what the device means by zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialReading {
    pub date: Option<String>,
    pub time: Option<String>,
    pub water_temperature: Option<f64>,
    pub tds: Option<f64>,
    pub humidity: Option<f64>,
    pub environment_temperature: Option<f64>,
    pub water_level: Option<f64>,
    pub ph: Option<f64>,
}

impl PartialReading {
    pub fn measurement(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::WaterTemperature => self.water_temperature,
            Channel::Tds => self.tds,
            Channel::Humidity => self.humidity,
            Channel::EnvironmentTemperature => self.environment_temperature,
            Channel::WaterLevel => self.water_level,
            Channel::Ph => self.ph,
        }
    }

    fn measurement_mut(&mut self, channel: Channel) -> &mut Option<f64> {
        match channel {
            Channel::WaterTemperature => &mut self.water_temperature,
            Channel::Tds => &mut self.tds,
            Channel::Humidity => &mut self.humidity,
            Channel::EnvironmentTemperature => &mut self.environment_temperature,
            Channel::WaterLevel => &mut self.water_level,
            Channel::Ph => &mut self.ph,
        }
    }

    /// The channel's value with unset reported as `0`.
    pub fn value(&self, channel: Channel) -> f64 {
        self.measurement(channel).unwrap_or(0.0)
    }

    pub fn is_observed(&self, channel: Channel) -> bool {
        matches!(self.measurement(channel), Some(v) if v != 0.0 && !v.is_nan())
    }

    pub fn is_complete(&self) -> bool {
        let has_text = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.is_empty());

        has_text(&self.date)
            && has_text(&self.time)
            && Channel::ALL.iter().all(|&c| self.is_observed(c))
    }

    /// Stamps the record as a [`Reading`] if it is complete.
    pub fn to_reading(&self, recorded_at: DateTime<Utc>) -> Option<Reading> {
        if !self.is_complete() {
            return None;
        }

        Some(Reading {
            date: self.date.clone()?,
            time: self.time.clone()?,
            water_temperature: self.value(Channel::WaterTemperature),
            tds: self.value(Channel::Tds),
            humidity: self.value(Channel::Humidity),
            environment_temperature: self.value(Channel::EnvironmentTemperature),
            water_level: self.value(Channel::WaterLevel),
            ph: self.value(Channel::Ph),
            recorded_at,
        })
    }
}

/// Holds the single in-progress record and applies decoded fields to it.
///
/// Persisting and resetting are left to the caller.
#[derive(Debug, Default)]
pub struct ReadingAccumulator {
    current: PartialReading,
}

impl ReadingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &PartialReading {
        &self.current
    }

    pub fn apply(&mut self, field: Field) {
        match field {
            Field::Date(date) => self.current.date = date,
            Field::Time(time) => self.current.time = time,
            Field::Measurement(channel, value) => *self.current.measurement_mut(channel) = value,
        }
    }

    /// Decodes and applies a label/value pair. On error the record is left untouched.
    pub fn apply_pair(&mut self, key: &str, value: &str) -> Result<(), FieldError> {
        let field = Field::from_pair(key, value)?;
        self.apply(field);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_complete()
    }

    pub fn reset(&mut self) {
        self.current = PartialReading::default();
    }
}
