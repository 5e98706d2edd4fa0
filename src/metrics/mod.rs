//! Metric identities, samples and the collector/sink contract
//!
//! Descriptor tables are `static` items initialised at compile time, so they
//! are shared by every collection cycle without synchronisation.

pub mod exposition;

pub use exposition::{render_descriptors, render_text};

use crate::error::{AppError, Result};
use async_trait::async_trait;

/// Identity of one exported gauge family
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDesc {
    pub namespace: &'static str,
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl MetricDesc {
    /// Fully-qualified metric name (`namespace_name`)
    pub fn fq_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{}_{}", self.namespace, self.name)
        }
    }
}

/// One gauge value with its label values, in descriptor label order
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub desc: &'static MetricDesc,
    pub value: f64,
    pub label_values: Vec<String>,
}

impl Sample {
    /// Build a sample, checking the label values against the descriptor
    pub fn new<S: AsRef<str>>(desc: &'static MetricDesc, value: f64, label_values: &[S]) -> Result<Self> {
        if label_values.len() != desc.labels.len() {
            return Err(AppError::validation(format!(
                "metric {} expects {} label values, got {}",
                desc.fq_name(),
                desc.labels.len(),
                label_values.len()
            )));
        }
        Ok(Self {
            desc,
            value,
            label_values: label_values.iter().map(|v| v.as_ref().to_string()).collect(),
        })
    }

    /// Sample for a descriptor without labels
    pub fn unlabeled(desc: &'static MetricDesc, value: f64) -> Result<Self> {
        Self::new::<&str>(desc, value, &[])
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .labels
            .iter()
            .position(|l| *l == name)
            .and_then(|i| self.label_values.get(i))
            .map(String::as_str)
    }
}

/// Receiver of samples produced by a collection cycle
pub trait MetricSink: Send {
    fn emit(&mut self, sample: Sample);
}

/// A unit that performs one measurement cycle per `collect` call
#[async_trait]
pub trait Collector: Send + Sync {
    /// The fixed set of metric identities; never measures
    fn describe(&self) -> &'static [&'static MetricDesc];

    /// Run one measurement cycle, streaming samples into `sink`
    async fn collect(&self, sink: &mut dyn MetricSink);
}

/// In-memory sink preserving emission order
#[derive(Debug, Default, Clone)]
pub struct MetricBuffer {
    samples: Vec<Sample>,
}

impl MetricBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }

    /// All samples of the given fully-qualified name
    pub fn find(&self, fq_name: &str) -> Vec<&Sample> {
        self.samples.iter().filter(|s| s.desc.fq_name() == fq_name).collect()
    }

    /// Value of the single sample with this name, if exactly one exists
    pub fn value_of(&self, fq_name: &str) -> Option<f64> {
        match self.find(fq_name).as_slice() {
            [only] => Some(only.value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl MetricSink for MetricBuffer {
    fn emit(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}

/// Emit a sample, logging instead of panicking on a descriptor mismatch
pub(crate) fn emit_or_log<S: AsRef<str>>(
    sink: &mut dyn MetricSink,
    logger: &crate::logging::Logger,
    desc: &'static MetricDesc,
    value: f64,
    label_values: &[S],
) {
    match Sample::new(desc, value, label_values) {
        Ok(sample) => sink.emit(sample),
        Err(e) => logger
            .error("Dropping invalid sample")
            .field("metric", desc.fq_name())
            .app_error(&e)
            .log(),
    }
}
