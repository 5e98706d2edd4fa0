//! Collector for the speedtest.net server network

pub mod provider;
pub mod runner;

pub use provider::{HttpProvider, MeasurementProvider};
pub use runner::ServiceRunner;

use crate::logging::Logger;
use crate::metrics::{emit_or_log, Collector, MetricDesc, MetricSink};
use crate::models::{Reading, ServerSelector};
use crate::units;
use async_trait::async_trait;
use std::time::Instant;

pub const NAMESPACE: &str = "speedtest";

const LABELS: &[&str] = &["server_id", "server_name", "server_country", "user_isp"];

pub static UP: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "up",
    help: "Was the last speedtest successful.",
    labels: &[],
};

pub static SCRAPE_DURATION_SECONDS: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "scrape_duration_seconds",
    help: "Time to perform last speed test",
    labels: &[],
};

pub static LATENCY_SECONDS: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "latency_seconds",
    help: "Measured latency on last speed test",
    labels: LABELS,
};

pub static UPLOAD_SPEED_BPS: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "upload_speed_Bps",
    help: "Last upload speedtest result",
    labels: LABELS,
};

pub static DOWNLOAD_SPEED_BPS: MetricDesc = MetricDesc {
    namespace: NAMESPACE,
    name: "download_speed_Bps",
    help: "Last download speedtest result",
    labels: LABELS,
};

static DESCRIPTORS: [&MetricDesc; 5] = [
    &UP,
    &SCRAPE_DURATION_SECONDS,
    &LATENCY_SECONDS,
    &UPLOAD_SPEED_BPS,
    &DOWNLOAD_SPEED_BPS,
];

fn descriptor_for(reading: &Reading) -> &'static MetricDesc {
    match reading {
        Reading::LatencySeconds(_) => &LATENCY_SECONDS,
        Reading::DownloadBps(_) => &DOWNLOAD_SPEED_BPS,
        Reading::UploadBps(_) => &UPLOAD_SPEED_BPS,
    }
}

/// Runs one speedtest per scrape against the selected server
#[derive(Debug, Clone)]
pub struct SpeedtestCollector<P> {
    runner: ServiceRunner<P>,
    logger: Logger,
}

impl<P: MeasurementProvider> SpeedtestCollector<P> {
    pub fn new(provider: P, selector: ServerSelector, server_fallback: bool, logger: Logger) -> Self {
        Self {
            runner: ServiceRunner::new(provider, selector, server_fallback, logger.clone()),
            logger,
        }
    }

    pub fn runner(&self) -> &ServiceRunner<P> {
        &self.runner
    }

    async fn measure(&self, sink: &mut dyn MetricSink, correlation_id: &str) -> bool {
        let logger = &self.logger;
        let emitted = self
            .runner
            .run(correlation_id, |server, user, reading| {
                let [id, name, country] = server.label_values();
                let labels = [id, name, country, user.isp.as_str()];
                emit_or_log(sink, logger, descriptor_for(&reading), reading.value(), &labels);
            })
            .await;

        match emitted {
            Ok(result) => result.is_success(),
            Err(e) => {
                logger
                    .error("speedtest failed before any sub-test ran")
                    .correlation_id(correlation_id)
                    .error_info(&e)
                    .log();
                false
            }
        }
    }
}

#[async_trait]
impl<P: MeasurementProvider> Collector for SpeedtestCollector<P> {
    fn describe(&self) -> &'static [&'static MetricDesc] {
        &DESCRIPTORS
    }

    async fn collect(&self, sink: &mut dyn MetricSink) {
        let start = Instant::now();
        let correlation_id = self.logger.start_cycle("speedtest");

        let ok = self.measure(sink, &correlation_id).await;

        emit_or_log::<&str>(sink, &self.logger, &UP, if ok { 1.0 } else { 0.0 }, &[]);
        let elapsed = units::duration_to_seconds(start.elapsed());
        emit_or_log::<&str>(sink, &self.logger, &SCRAPE_DURATION_SECONDS, elapsed, &[]);

        self.logger.end_cycle(&correlation_id, "speedtest", ok, elapsed);
    }
}
