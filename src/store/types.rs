use serde::{Deserialize, Deserializer};

/// One probe result as stored under `sensorData.<source>`.
///
/// `gateway` and `target_url` are not trusted from the document; they are
/// overwritten from configuration by [`Measurement::with_target`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Measurement {
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    /// Round-trip latency in milliseconds.
    #[serde(deserialize_with = "null_as_default")]
    pub latency: f64,
    #[serde(rename = "url", deserialize_with = "null_as_default")]
    pub target_url: String,
    #[serde(rename = "serverlocation", deserialize_with = "null_as_default")]
    pub gateway: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub params: String,
    #[serde(rename = "result", deserialize_with = "null_as_default")]
    pub results: Vec<CommandResult>,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
}

/// Writers emit `null` for unset strings and empty lists; read those as the zero value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Measurement {
    /// Inject the labels the store does not carry.
    pub fn with_target(self, gateway: &str, target_url: &str) -> Self {
        Self {
            gateway: gateway.to_owned(),
            target_url: target_url.to_owned(),
            ..self
        }
    }
}

/// Per-hop detail of a probe run. Stored documents carry an empty list today.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandResult {}

/// Everything one origin reported at a single client timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeGroup {
    pub origin: String,
    /// Client-observed Unix time in whole seconds; zero when unknown.
    pub client_utc: i64,
    pub measurements: Vec<Measurement>,
}

impl ProbeGroup {
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

/// Result of one collection pass, one group per configured origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllData {
    pub groups: Vec<ProbeGroup>,
}

impl AllData {
    pub fn measurement_count(&self) -> usize {
        self.groups.iter().map(|g| g.measurements.len()).sum()
    }
}

/// Closed interval `[start, end]` of client timestamps, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: i64,
    pub end: i64,
}

impl QueryWindow {
    pub fn ending_at(now: i64, lookback_secs: i64) -> Self {
        Self {
            start: now - lookback_secs,
            end: now,
        }
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_closed_at_both_ends() {
        let t = 1_700_000_000;
        let window = QueryWindow::ending_at(t, 180);

        assert_eq!(window.start, t - 180);
        assert_eq!(window.end, t);
        assert!(window.contains(t - 180));
        assert!(window.contains(t));
        assert!(!window.contains(t - 181));
        assert!(!window.contains(t + 1));
    }

    #[test]
    fn with_target_overwrites_labels_only() {
        let m = Measurement {
            status: "ok".into(),
            latency: 12.0,
            target_url: "stale.example.com".into(),
            gateway: "stale".into(),
            ..Default::default()
        }
        .with_target("Amazon", "useast1-public-ubiservices.ubi.com");

        assert_eq!(m.gateway, "Amazon");
        assert_eq!(m.target_url, "useast1-public-ubiservices.ubi.com");
        assert_eq!(m.status, "ok");
        assert_eq!(m.latency, 12.0);
    }

    #[test]
    fn measurement_count_spans_groups() {
        let data = AllData {
            groups: vec![
                ProbeGroup {
                    measurements: vec![Measurement::default(), Measurement::default()],
                    ..Default::default()
                },
                ProbeGroup::default(),
            ],
        };
        assert_eq!(data.measurement_count(), 2);
        assert!(data.groups[1].is_empty());
    }
}
