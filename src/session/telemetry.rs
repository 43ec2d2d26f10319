// Time-indexed lap telemetry with optional named channels

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::TracksideError;

pub const DISTANCE_CHANNEL: &str = "Distance";
pub const DRS_CHANNEL: &str = "DRS";
pub const X_CHANNEL: &str = "X";
pub const Y_CHANNEL: &str = "Y";
pub const SPEED_CHANNEL: &str = "Speed";
pub const GEAR_CHANNEL: &str = "nGear";

/// A single sample value as published by the data source.
///
/// Sources are not strict about types: a DRS level can arrive as a number, a
/// numeric string or garbage, so values are kept as-is and interpreted on read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChannelValue {
    Number(f64),
    Flag(bool),
    Text(String),
    Null,
    /// Anything else the source wrote (arrays, objects), never numeric
    Other(serde_json::Value),
}

impl ChannelValue {
    /// Interpret the value as a number, `None` when it can't be parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ChannelValue::Number(value) => Some(*value),
            ChannelValue::Flag(flag) => Some(if *flag { 1. } else { 0. }),
            ChannelValue::Text(text) => text.trim().parse::<f64>().ok(),
            ChannelValue::Null | ChannelValue::Other(_) => None,
        }
    }
}

impl From<f64> for ChannelValue {
    fn from(value: f64) -> Self {
        ChannelValue::Number(value)
    }
}

impl From<i32> for ChannelValue {
    fn from(value: i32) -> Self {
        ChannelValue::Number(value as f64)
    }
}

impl From<u32> for ChannelValue {
    fn from(value: u32) -> Self {
        ChannelValue::Number(value as f64)
    }
}

impl From<bool> for ChannelValue {
    fn from(value: bool) -> Self {
        ChannelValue::Flag(value)
    }
}

impl From<&str> for ChannelValue {
    fn from(value: &str) -> Self {
        ChannelValue::Text(value.to_string())
    }
}

/// One row of a telemetry file: session time plus whatever channels were recorded
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TelemetryRow {
    #[serde(rename = "Time")]
    pub time_s: f64,
    #[serde(flatten)]
    pub channels: BTreeMap<String, ChannelValue>,
}

/// Column-oriented telemetry for one lap.
///
/// `time` holds session time in seconds, every channel has exactly one value
/// per time sample. Channel presence is not guaranteed, probe with
/// [`Telemetry::channel`] before use.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Telemetry {
    time: Vec<f64>,
    channels: BTreeMap<String, Vec<ChannelValue>>,
}

impl Telemetry {
    pub fn new(time: Vec<f64>) -> Self {
        Self {
            time,
            channels: BTreeMap::new(),
        }
    }

    /// Attach a channel, the number of values must match the number of samples
    pub fn with_channel<V: Into<ChannelValue>>(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, TracksideError> {
        let values: Vec<ChannelValue> = values.into_iter().map(Into::into).collect();
        if values.len() != self.time.len() {
            return Err(TracksideError::ChannelLengthMismatch {
                channel: name.to_string(),
                expected: self.time.len(),
                actual: values.len(),
            });
        }
        self.channels.insert(name.to_string(), values);
        Ok(self)
    }

    /// Build columns from rows. A channel missing from some rows is padded with nulls.
    pub fn from_rows(rows: Vec<TelemetryRow>) -> Self {
        let mut channels: BTreeMap<String, Vec<ChannelValue>> = BTreeMap::new();
        let mut time = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            time.push(row.time_s);
            for (name, value) in row.channels {
                let column = channels
                    .entry(name)
                    .or_insert_with(|| vec![ChannelValue::Null; idx]);
                column.push(value);
            }
            for column in channels.values_mut() {
                if column.len() < idx + 1 {
                    column.push(ChannelValue::Null);
                }
            }
        }
        Self { time, channels }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.time
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn channel(&self, name: &str) -> Option<&[ChannelValue]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Numeric view of a channel, unparseable samples become `None`
    pub fn numeric(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.channel(name)
            .map(|values| values.iter().map(ChannelValue::as_f64).collect())
    }

    /// Largest numeric value of a channel, ignoring unparseable samples
    pub fn max_value(&self, name: &str) -> Option<f64> {
        self.channel(name)?
            .iter()
            .filter_map(ChannelValue::as_f64)
            .filter(|value| value.is_finite())
            .fold(None, |max, value| match max {
                Some(cur) if cur >= value => Some(cur),
                _ => Some(value),
            })
    }
}
