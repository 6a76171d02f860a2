//! Translation from probe data to Prometheus descriptors, samples and text.

use std::collections::{BTreeMap, HashMap, HashSet};

use prometheus::core::Desc;
use prometheus::proto::{Gauge, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tracing::warn;

use crate::store::{AllData, Measurement, ProbeGroup};

pub const METRIC_NAME: &str = "CCM_Latency";
pub const METRIC_HELP: &str = "(latency of services accessing gateway)";

pub const LABEL_GATEWAY: &str = "gateway";
pub const LABEL_ISP: &str = "isp";
pub const LABEL_DOMAIN: &str = "domain";

/// One gauge observation ready for exposition.
#[derive(Debug, Clone)]
pub struct LatencySample {
    pub desc: Desc,
    /// Latency in milliseconds.
    pub value: f64,
    /// Client-observed time in Unix milliseconds; zero means "no timestamp".
    pub timestamp_ms: i64,
}

/// Descriptor for one (gateway, origin, target URL) combination.
///
/// The label values are part of the descriptor's identity, so every distinct
/// triple yields its own descriptor under the shared metric name.
pub fn descriptor_for(group: &ProbeGroup, m: &Measurement) -> prometheus::Result<Desc> {
    let labels = HashMap::from([
        (LABEL_GATEWAY.to_string(), m.gateway.clone()),
        (LABEL_ISP.to_string(), group.origin.clone()),
        (LABEL_DOMAIN.to_string(), m.target_url.clone()),
    ]);
    Desc::new(METRIC_NAME.into(), METRIC_HELP.into(), vec![], labels)
}

/// Flatten probe data into one sample per measurement.
///
/// A repeated label triple within the same pass keeps the first sample.
pub fn samples_from(data: &AllData) -> prometheus::Result<Vec<LatencySample>> {
    let mut seen = HashSet::new();
    let mut samples = Vec::with_capacity(data.measurement_count());

    for group in &data.groups {
        for m in &group.measurements {
            let desc = descriptor_for(group, m)?;
            if !seen.insert(desc.id) {
                warn!(
                    gateway = %m.gateway,
                    isp = %group.origin,
                    domain = %m.target_url,
                    "duplicate series in one scrape, keeping the first"
                );
                continue;
            }
            samples.push(LatencySample {
                desc,
                value: m.latency,
                timestamp_ms: group.client_utc.saturating_mul(1000),
            });
        }
    }

    Ok(samples)
}

fn to_metric(sample: &LatencySample) -> Metric {
    let mut labels = sample.desc.const_label_pairs.clone();
    labels.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let mut gauge = Gauge::default();
    gauge.set_value(sample.value);

    let mut metric = Metric::default();
    metric.set_label(labels.into());
    metric.set_gauge(gauge);
    if sample.timestamp_ms != 0 {
        metric.set_timestamp_ms(sample.timestamp_ms);
    }
    metric
}

/// Group samples under the shared metric name. `None` when there are none,
/// since the text encoder rejects empty families.
pub fn latency_family(samples: &[LatencySample]) -> Option<MetricFamily> {
    if samples.is_empty() {
        return None;
    }

    let mut family = MetricFamily::default();
    family.set_name(METRIC_NAME.to_string());
    family.set_help(METRIC_HELP.to_string());
    family.set_field_type(MetricType::GAUGE);
    family.set_metric(samples.iter().map(to_metric).collect::<Vec<_>>().into());
    Some(family)
}

/// Render families in the text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> prometheus::Result<String> {
    TextEncoder::new().encode_to_string(families)
}

pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// JSON view of a descriptor for the `/descriptors` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptorView {
    pub name: String,
    pub help: String,
    pub labels: BTreeMap<String, String>,
}

impl From<&Desc> for DescriptorView {
    fn from(desc: &Desc) -> Self {
        Self {
            name: desc.fq_name.clone(),
            help: desc.help.clone(),
            labels: desc
                .const_label_pairs
                .iter()
                .map(|p| (p.get_name().to_string(), p.get_value().to_string()))
                .collect(),
        }
    }
}
