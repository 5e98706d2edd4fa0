//! Speedtest Exporter - runs one collection cycle and prints the metrics
//! in the Prometheus text exposition format.

use clap::Parser;
use speedtest_exporter::{
    build_collector,
    cli::Cli,
    config::{display_config_summary, load_config},
    error::Result,
    logging::{LogLevel, Logger},
    metrics::{render_descriptors, render_text, MetricBuffer},
    PKG_NAME, VERSION,
};
use std::io::Write;
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let use_color = !cli.no_color;

    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_color));
        process::exit(e.exit_code());
    }
}

async fn run_application(cli: Cli) -> Result<()> {
    let describe_only = cli.describe;
    let config = load_config(cli)?;

    let logger = Logger::with_config(PKG_NAME, &config).with_session_id(&uuid::Uuid::new_v4().to_string());
    if logger.would_log(LogLevel::Debug) {
        logger
            .debug(&format!("{} v{} starting", PKG_NAME, VERSION))
            .field("config", display_config_summary(&config))
            .log();
    }

    let collector = build_collector(&config, &logger)?;
    let text = if describe_only {
        render_descriptors(collector.describe())?
    } else {
        let mut buffer = MetricBuffer::new();
        collector.collect(&mut buffer).await;
        render_text(collector.describe(), buffer.samples())?
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
