//! Lenient decoding of stored probe documents.
//!
//! Schema drift in the store never fails a scrape: missing or mistyped
//! fields fall back to their zero value and are reported as [`DecodeIssue`]s
//! so the caller can log and count them.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::{Measurement, ProbeGroup};
use crate::config::ProbeTarget;

pub const FIELD_ORIGIN: &str = "isp";
pub const FIELD_CLIENT_UTC: &str = "clientutc";
pub const FIELD_SENSOR_DATA: &str = "sensorData";

/// A field that could not be read as expected.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeIssue {
    /// The document is not a JSON object.
    Malformed { reason: String },
    Missing { field: String },
    Mismatch { field: String, expected: &'static str, found: &'static str },
    /// A probe sub-document exists but does not fit [`Measurement`].
    Probe { source: String, reason: String },
}

impl DecodeIssue {
    /// Field name used as the metric label when counting this issue.
    pub fn field(&self) -> &str {
        match self {
            Self::Malformed { .. } => "document",
            Self::Missing { field } | Self::Mismatch { field, .. } => field,
            Self::Probe { source, .. } => source,
        }
    }
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { reason } => write!(f, "malformed document: {reason}"),
            Self::Missing { field } => write!(f, "field `{field}` missing"),
            Self::Mismatch { field, expected, found } => {
                write!(f, "field `{field}` is {found}, expected {expected}")
            }
            Self::Probe { source, reason } => write!(f, "probe `{source}` undecodable: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecodeOutcome {
    pub group: ProbeGroup,
    pub issues: Vec<DecodeIssue>,
}

/// Decode one raw document into a [`ProbeGroup`].
///
/// Each configured probe is read from `sensorData.<source>`, decoded, and
/// enriched with its configured gateway label and target URL. Probes that
/// are absent or malformed are skipped.
pub fn decode_probe_group(raw: &str, probes: &[ProbeTarget]) -> DecodeOutcome {
    let mut out = DecodeOutcome::default();

    let doc: Map<String, Value> = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            out.issues.push(DecodeIssue::Malformed {
                reason: format!("top level is {}", kind_of(&other)),
            });
            return out;
        }
        Err(e) => {
            out.issues.push(DecodeIssue::Malformed { reason: e.to_string() });
            return out;
        }
    };

    match doc.get(FIELD_ORIGIN) {
        Some(Value::String(s)) => out.group.origin = s.clone(),
        Some(other) => out.issues.push(mismatch(FIELD_ORIGIN, "string", other)),
        None => out.issues.push(missing(FIELD_ORIGIN)),
    }

    match doc.get(FIELD_CLIENT_UTC) {
        // Stored as a float; fractional seconds are dropped.
        Some(Value::Number(n)) => out.group.client_utc = n.as_f64().map_or(0, |f| f as i64),
        Some(other) => out.issues.push(mismatch(FIELD_CLIENT_UTC, "number", other)),
        None => out.issues.push(missing(FIELD_CLIENT_UTC)),
    }

    let sensor = match doc.get(FIELD_SENSOR_DATA) {
        Some(Value::Object(map)) => map,
        Some(other) => {
            out.issues.push(mismatch(FIELD_SENSOR_DATA, "object", other));
            return out;
        }
        None => {
            out.issues.push(missing(FIELD_SENSOR_DATA));
            return out;
        }
    };

    for probe in probes {
        let Some(sub) = sensor.get(&probe.source) else {
            out.issues.push(missing(&format!("{FIELD_SENSOR_DATA}.{}", probe.source)));
            continue;
        };
        match Measurement::deserialize(sub) {
            Ok(m) => out
                .group
                .measurements
                .push(m.with_target(&probe.gateway, &probe.target_url)),
            Err(e) => out.issues.push(DecodeIssue::Probe {
                source: probe.source.clone(),
                reason: e.to_string(),
            }),
        }
    }

    out
}

fn missing(field: &str) -> DecodeIssue {
    DecodeIssue::Missing { field: field.to_owned() }
}

fn mismatch(field: &str, expected: &'static str, found: &Value) -> DecodeIssue {
    DecodeIssue::Mismatch {
        field: field.to_owned(),
        expected,
        found: kind_of(found),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
