use std::num::ParseFloatError;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::telemetry::Channel;

// `<label>: <value>`, where the label is word characters and spaces.
static KEY_VALUE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w[\w\s]*):\s*(.*)$").expect("valid key/value regex"));

/// Splits a raw device line into its trimmed label and value.
///
/// Returns `None` for lines that do not have the `<label>: <value>` shape. The value may be
/// empty.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let captures = KEY_VALUE_LINE.captures(line)?;
    let key = captures.get(1)?.as_str().trim();
    let value = captures.get(2)?.as_str().trim();
    Some((key, value))
}

/// One typed field decoded from a device line.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Date(Option<String>),
    Time(Option<String>),
    Measurement(Channel, Option<f64>),
}

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    #[error("invalid number for {channel}: {value:?}")]
    InvalidNumber {
        channel: Channel,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

impl Field {
    /// Decodes a label/value pair as produced by [`parse_line`].
    ///
    /// Empty values decode to `None`, which clears the field.
    pub fn from_pair(key: &str, value: &str) -> Result<Self, FieldError> {
        let text = (!value.is_empty()).then(|| value.to_string());

        match key {
            "Date" => Ok(Field::Date(text)),
            "Time" => Ok(Field::Time(text)),
            _ => {
                let channel: Channel = key
                    .parse()
                    .map_err(|_| FieldError::UnknownLabel(key.to_string()))?;
                if value.is_empty() {
                    return Ok(Field::Measurement(channel, None));
                }
                let number = value
                    .parse::<f64>()
                    .map_err(|source| FieldError::InvalidNumber {
                        channel,
                        value: value.to_string(),
                        source,
                    })?;
                Ok(Field::Measurement(channel, Some(number)))
            }
        }
    }
}
