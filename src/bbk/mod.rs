//! Collector for the external `bbk` measurement binary

pub mod parser;
pub mod runner;

pub use parser::parse_quiet_output;
pub use runner::{BbkRunner, BBK_ARGS};

use crate::logging::Logger;
use crate::metrics::{emit_or_log, Collector, MetricDesc, MetricSink};
use crate::models::ParsedFields;
use crate::units;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const NAMESPACE: &str = "bbk";

const LABELS: &[&str] = &["server", "isp"];

pub static UP: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "up",
    help: "Was the last BBK measurement successful.",
    labels: &[],
};

pub static SCRAPE_DURATION_SECONDS: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "scrape_duration_seconds",
    help: "Time to perform last BBK measurement",
    labels: &[],
};

pub static LATENCY_SECONDS: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "latency_seconds",
    help: "Measured latency on last BBK measurement",
    labels: LABELS,
};

pub static UPLOAD_SPEED_BPS: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "upload_speed_Bps",
    help: "Last BBK upload measurement result",
    labels: LABELS,
};

pub static DOWNLOAD_SPEED_BPS: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "download_speed_Bps",
    help: "Last BBK download measurement result",
    labels: LABELS,
};

static DESCRIPTORS: [&MetricDesc; 5] = [
    &UP,
    &SCRAPE_DURATION_SECONDS,
    &LATENCY_SECONDS,
    &UPLOAD_SPEED_BPS,
    &DOWNLOAD_SPEED_BPS,
];

/// Runs one bbk measurement per scrape
#[derive(Debug, Clone)]
pub struct BbkCollector {
    runner: BbkRunner,
    logger: Logger,
}

impl BbkCollector {
    pub fn new(binary_path: impl Into<PathBuf>, timeout: Duration, logger: Logger) -> Self {
        Self {
            runner: BbkRunner::new(binary_path, timeout, logger.clone()),
            logger,
        }
    }

    pub fn runner(&self) -> &BbkRunner {
        &self.runner
    }

    async fn measure(&self, sink: &mut dyn MetricSink, correlation_id: &str) -> bool {
        let fields = match self.runner.run(correlation_id).await {
            Ok(fields) => fields,
            Err(e) => {
                self.logger
                    .error("bbk measurement failed")
                    .correlation_id(correlation_id)
                    .field("binary", self.runner.binary_path().display().to_string())
                    .error_info(&e)
                    .log();
                return false;
            }
        };

        self.warn_implausible(&fields, correlation_id);
        self.logger
            .debug("bbk measurement parsed")
            .correlation_id(correlation_id)
            .field("server", &fields.server)
            .field("isp", &fields.isp)
            .field("measurement_id", &fields.measurement_id)
            .field("ticket", &fields.ticket)
            .field("rating", &fields.rating)
            .log();

        let labels = [fields.server.as_str(), fields.isp.as_str()];
        emit_or_log(
            sink,
            &self.logger,
            &DOWNLOAD_SPEED_BPS,
            units::mbps_to_bytes_per_second(fields.download_mbps),
            &labels,
        );
        emit_or_log(
            sink,
            &self.logger,
            &UPLOAD_SPEED_BPS,
            units::mbps_to_bytes_per_second(fields.upload_mbps),
            &labels,
        );
        emit_or_log(
            sink,
            &self.logger,
            &LATENCY_SECONDS,
            units::millis_to_seconds(fields.latency_ms),
            &labels,
        );

        true
    }

    fn warn_implausible(&self, fields: &ParsedFields, correlation_id: &str) {
        for (name, value) in [
            ("download", fields.download_mbps),
            ("upload", fields.upload_mbps),
            ("latency", fields.latency_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                self.logger
                    .warn("Implausible bbk reading exported unchanged")
                    .correlation_id(correlation_id)
                    .field("field", name)
                    .field("value", value.to_string())
                    .log();
            }
        }
    }
}

#[async_trait]
impl Collector for BbkCollector {
    fn describe(&self) -> &'static [&'static MetricDesc] {
        &DESCRIPTORS
    }

    async fn collect(&self, sink: &mut dyn MetricSink) {
        let start = Instant::now();
        let correlation_id = self.logger.start_cycle("bbk measurement");

        let ok = self.measure(sink, &correlation_id).await;

        emit_or_log::<&str>(sink, &self.logger, &UP, if ok { 1.0 } else { 0.0 }, &[]);
        let elapsed = units::duration_to_seconds(start.elapsed());
        emit_or_log::<&str>(sink, &self.logger, &SCRAPE_DURATION_SECONDS, elapsed, &[]);

        self.logger.end_cycle(&correlation_id, "bbk measurement", ok, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use crate::metrics::MetricBuffer;

    fn collector(path: &str) -> BbkCollector {
        let mut logger = Logger::new("bbk");
        logger.set_level(LogLevel::Fatal);
        BbkCollector::new(path, Duration::from_secs(5), logger)
    }

    #[test]
    fn test_describe_is_fixed() {
        let collector = collector("/does/not/matter");
        let names: Vec<String> = collector.describe().iter().map(|d| d.fq_name()).collect();
        assert_eq!(
            names,
            [
                "bbk_up",
                "bbk_scrape_duration_seconds",
                "bbk_latency_seconds",
                "bbk_upload_speed_Bps",
                "bbk_download_speed_Bps",
            ]
        );
        assert_eq!(collector.describe(), collector.describe());
        assert_eq!(LATENCY_SECONDS.labels, &["server", "isp"]);
    }

    #[tokio::test]
    async fn test_start_failure_emits_up_zero_and_duration_only() {
        let collector = collector("/nonexistent/bbk");
        let mut sink = MetricBuffer::new();
        collector.collect(&mut sink).await;

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.value_of("bbk_up"), Some(0.0));
        assert!(sink.value_of("bbk_scrape_duration_seconds").unwrap() >= 0.0);
    }
}
