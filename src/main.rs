//! redwire - headless redstone circuit runner
//!
//! Builds a circuit from a TOML scenario, plays its steps and reports the
//! resulting wire powers.

mod config;
mod scenario;

use anyhow::{Context, Result};
use config::AppConfig;
use redwire_testkit::{JsonlSink, MetricsReportBuilder, MetricsSink, TestExecutionMetrics};
use redwire_world::RedstoneEngine;
use scenario::Scenario;
use std::time::Instant;
use std::{env, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    // WARN by default, RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting redwire v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    if cli.help {
        print_usage();
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };
    let scenario = match &cli.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo()?,
    };

    let mut engine =
        RedstoneEngine::try_new(config.engine).context("Invalid engine configuration")?;
    info!(
        strategy = engine.strategy_kind().name(),
        scenario = %scenario.name,
        "Engine ready"
    );

    let mut events = cli.events.as_ref().map(JsonlSink::create).transpose()?;
    let started = Instant::now();
    let (_grid, summary) = scenario::run(&scenario, &mut engine, events.as_mut())?;
    let elapsed = started.elapsed();

    for (pos, power) in &summary.wires {
        info!(pos = %pos, power, "Wire power");
        if config.print_wires {
            println!("{pos} {power}");
        }
    }
    let stats = engine.stats();
    println!(
        "{}: {} steps, {} ticks, {} wires, {} power writes, {} updates ({} strategy, {:.3} ms)",
        scenario.name,
        summary.steps,
        summary.ticks,
        summary.wires.len(),
        stats.power_writes,
        engine.dispatch_stats().updates,
        engine.strategy_kind().name(),
        elapsed.as_secs_f64() * 1000.0
    );

    if let Some(path) = &cli.metrics {
        let report = MetricsReportBuilder::new(scenario.name.clone())
            .engine(&engine)
            .execution(TestExecutionMetrics {
                duration_seconds: elapsed.as_secs_f64(),
                ticks_stepped: Some(summary.ticks),
                assertions_checked: None,
            })
            .build();
        MetricsSink::create(path)?.write(&report)?;
        info!(path = %path.display(), "Metrics written");
    }

    Ok(())
}

fn print_usage() {
    println!(
        "Usage: redwire [--config PATH] [--scenario PATH] [--events PATH] [--metrics PATH]\n\
         \n\
         Without --scenario the bundled demo circuit is run.\n\
         Set RUST_LOG=info to see per-wire powers in the log."
    );
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    scenario: Option<PathBuf>,
    events: Option<PathBuf>,
    metrics: Option<PathBuf>,
    help: bool,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            let slot = match arg.as_str() {
                "--config" => &mut opts.config,
                "--scenario" => &mut opts.scenario,
                "--events" => &mut opts.events,
                "--metrics" => &mut opts.metrics,
                "-h" | "--help" => {
                    opts.help = true;
                    continue;
                }
                other => {
                    tracing::warn!(arg = other, "Ignoring unknown argument");
                    continue;
                }
            };
            if let Some(path) = args.next() {
                *slot = Some(PathBuf::from(path));
            } else {
                tracing::error!("{arg} requires a path");
            }
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_paths() {
        let opts = parse(&["--scenario", "a.toml", "--metrics", "out/m.json"]);
        assert_eq!(opts.scenario, Some(PathBuf::from("a.toml")));
        assert_eq!(opts.metrics, Some(PathBuf::from("out/m.json")));
        assert!(opts.config.is_none());
        assert!(!opts.help);
    }

    #[test]
    fn missing_value_and_unknown_flags_are_ignored() {
        let opts = parse(&["--bogus", "--help", "--events"]);
        assert!(opts.help);
        assert!(opts.events.is_none());
    }
}
