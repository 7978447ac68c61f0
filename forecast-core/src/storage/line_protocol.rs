//! InfluxDB line protocol encoding.
//!
//! `measurement,tag=value field=value timestamp`, one point per line. Tags come
//! out sorted by key, which is what InfluxDB prefers for ingestion.

use std::fmt::Write;
use thiserror::Error;

use crate::model::{FieldValue, Point};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Point in '{0}' has no fields")]
    NoFields(String),

    #[error("Field '{field}' in '{measurement}' is not a finite number")]
    NonFiniteField { measurement: String, field: String },

    #[error("'{key}' in '{measurement}' contains a line break")]
    LineBreak { measurement: String, key: String },
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r'])
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

fn escape_string_field(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn encode_point(point: &Point) -> Result<String, EncodeError> {
    let measurement = point.measurement.as_str();
    if point.fields.is_empty() {
        return Err(EncodeError::NoFields(measurement.to_string()));
    }

    let line_break = |key: &str| EncodeError::LineBreak {
        measurement: measurement.to_string(),
        key: key.to_string(),
    };

    let mut line = escape_measurement(measurement);

    // Empty tag values are invalid in line protocol; such tags are left off.
    for (key, value) in point.tags.iter().filter(|(_, v)| !v.is_empty()) {
        if has_line_break(key) || has_line_break(value) {
            return Err(line_break(key.as_str()));
        }
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
    }

    for (i, (key, value)) in point.fields.iter().enumerate() {
        if has_line_break(key) {
            return Err(line_break(key.as_str()));
        }
        line.push(if i == 0 { ' ' } else { ',' });
        line.push_str(&escape_key(key));
        line.push('=');
        match value {
            FieldValue::Float(f) if f.is_finite() => {
                let _ = write!(line, "{f}");
            }
            FieldValue::Float(_) => {
                return Err(EncodeError::NonFiniteField {
                    measurement: measurement.to_string(),
                    field: key.clone(),
                });
            }
            FieldValue::Integer(n) => {
                let _ = write!(line, "{n}i");
            }
            FieldValue::String(s) if has_line_break(s) => return Err(line_break(key.as_str())),
            FieldValue::String(s) => {
                let _ = write!(line, "\"{}\"", escape_string_field(s));
            }
        }
    }

    let _ = write!(line, " {}", point.timestamp);
    Ok(line)
}

pub fn encode_batch(points: &[Point]) -> Result<String, EncodeError> {
    let lines = points.iter().map(encode_point).collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}
