use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// A named place whose forecast is collected on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One weather reading from the provider, either an hourly entry or the current conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSample {
    pub summary: String,
    pub icon: String,
    pub temperature: f64,
    pub dew_point: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    /// Left out by the provider when there is no wind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_bearing: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
    /// Epoch seconds.
    pub time: i64,
}

/// Everything fetched for one location in one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResponse {
    pub hourly: Vec<ForecastSample>,
    pub currently: ForecastSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measurement {
    Hourly,
    Currently,
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::Hourly => "hourly",
            Measurement::Currently => "currently",
        }
    }

    pub const fn all() -> &'static [Measurement] {
        &[Measurement::Hourly, Measurement::Currently]
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    String(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

/// A time-series record ready for storage.
///
/// Storage identity is `(measurement, tags, timestamp)`: writing the same point
/// twice replaces the earlier copy. Tags and fields are kept in sorted maps so
/// that two points built from the same input compare equal and serialise
/// identically.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: Measurement,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Point {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}
