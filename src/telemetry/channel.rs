use std::fmt;
use std::str::FromStr;

use anyhow::{Error, bail};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    WaterTemperature,
    Tds,
    Humidity,
    EnvironmentTemperature,
    WaterLevel,
    Ph,
}

impl Channel {
    /// Every channel, in the order the dashboard lists them.
    pub const ALL: [Channel; 6] = [
        Channel::WaterTemperature,
        Channel::Tds,
        Channel::Humidity,
        Channel::EnvironmentTemperature,
        Channel::WaterLevel,
        Channel::Ph,
    ];

    /// The label the device prints in front of this channel's value.
    pub fn label(&self) -> &'static str {
        match self {
            Channel::WaterTemperature => "Water Temperature",
            Channel::Tds => "TDS",
            Channel::Humidity => "Humidity",
            Channel::EnvironmentTemperature => "Environment Temperature",
            Channel::WaterLevel => "Water Level",
            Channel::Ph => "pH",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Channel::WaterTemperature => "water_temperature",
            Channel::Tds => "tds",
            Channel::Humidity => "humidity",
            Channel::EnvironmentTemperature => "environment_temperature",
            Channel::WaterLevel => "water_level",
            Channel::Ph => "ph",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Water Temperature" => Ok(Channel::WaterTemperature),
            "TDS" => Ok(Channel::Tds),
            "Humidity" => Ok(Channel::Humidity),
            "Environment Temperature" => Ok(Channel::EnvironmentTemperature),
            "Water Level" => Ok(Channel::WaterLevel),
            "pH" => Ok(Channel::Ph),
            _ => bail!("unknown channel label: {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for channel in Channel::ALL {
            assert_eq!(channel.label().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn labels_are_case_sensitive() {
        assert!("ph".parse::<Channel>().is_err());
        assert!("water temperature".parse::<Channel>().is_err());
        assert!("Tds".parse::<Channel>().is_err());
    }
}
