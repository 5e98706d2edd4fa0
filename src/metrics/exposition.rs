//! Prometheus text exposition via the `prometheus` crate
//!
//! Each render builds a throwaway registry holding one `GaugeVec` per
//! descriptor, so no state survives between scrapes.

use super::{MetricDesc, Sample};
use crate::error::{AppError, Result};
use prometheus::core::Desc;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;

fn gauge_vec(desc: &MetricDesc) -> Result<GaugeVec> {
    let opts = Opts::new(desc.name, desc.help).namespace(desc.namespace);
    Ok(GaugeVec::new(opts, desc.labels)?)
}

/// Render `samples` as text exposition, one gauge family per descriptor.
/// Families without samples are left out, as client libraries do.
pub fn render_text(descs: &[&'static MetricDesc], samples: &[Sample]) -> Result<String> {
    let registry = Registry::new();

    for desc in descs {
        let family = gauge_vec(desc)?;
        for sample in samples.iter().filter(|s| std::ptr::eq(s.desc, *desc)) {
            let labels: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
            family.get_metric_with_label_values(&labels)?.set(sample.value);
        }
        registry.register(Box::new(family))?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| AppError::internal(format!("exposition is not UTF-8: {}", e)))
}

/// Validate descriptors as Prometheus descriptors and list them, one per line:
/// `<name> gauge [<labels>] <help>`
pub fn render_descriptors(descs: &[&'static MetricDesc]) -> Result<String> {
    let mut out = String::new();

    for desc in descs {
        let checked = Desc::new(
            desc.fq_name(),
            desc.help.to_string(),
            desc.labels.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?;
        out.push_str(&format!(
            "{} gauge [{}] {}\n",
            checked.fq_name,
            checked.variable_labels.join(","),
            checked.help
        ));
    }

    Ok(out)
}
