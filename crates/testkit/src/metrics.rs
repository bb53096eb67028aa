//! Metrics reports exported by headless runs and tests.
//!
//! Reports are written as pretty JSON so CI can diff propagation cost between
//! strategies and catch regressions in update counts.

use anyhow::{Context, Result};
use redwire_world::{DispatchStats, EngineStats, RedstoneEngine};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Top-level metrics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test or scenario identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (RFC 3339)
    pub timestamp: String,

    /// Git commit hash (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,

    /// Overall result
    pub result: TestResult,

    /// Wire propagation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation: Option<PropagationMetrics>,

    /// Update dispatch metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchMetrics>,

    /// Execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Overall result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Passed all validations
    Pass,
    /// Failed
    Fail,
    /// Skipped
    Skip,
}

/// Wire propagation counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationMetrics {
    /// Strategy name
    pub strategy: String,
    /// Wire evaluations requested
    pub settles: u64,
    /// Power writes accepted by the world
    pub power_writes: u64,
    /// Hook consultations
    pub hook_calls: u64,
    /// Hook answers that differed from the proposal
    pub hook_overrides: u64,
    /// Whole-network solves
    pub network_solves: u64,
    /// Incremental graph relights
    pub graph_relights: u64,
    /// Batch evaluations that fell back to local settling
    pub fallbacks: u64,
    /// Scheduled ticks run
    pub ticks: u64,
    /// Shape cache hit rate (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_cache_hit_rate: Option<f64>,
}

impl PropagationMetrics {
    /// Counters from an engine's stats.
    pub fn from_stats(strategy: &str, stats: EngineStats) -> Self {
        Self {
            strategy: strategy.to_string(),
            settles: stats.settles,
            power_writes: stats.power_writes,
            hook_calls: stats.hook_calls,
            hook_overrides: stats.hook_overrides,
            network_solves: stats.network_solves,
            graph_relights: stats.graph_relights,
            fallbacks: stats.fallbacks,
            ticks: stats.ticks,
            shape_cache_hit_rate: None,
        }
    }
}

/// Update dispatcher counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMetrics {
    /// Cascades run
    pub cascades: u64,
    /// Updates executed
    pub updates: u64,
    /// Block writes
    pub writes: u64,
    /// Shape chains cut at the depth budget
    pub depth_truncations: u64,
    /// Cascades that hit the chained update cap
    pub overflows: u64,
    /// Neighbor updates vetoed
    pub vetoed: u64,
}

impl From<DispatchStats> for DispatchMetrics {
    fn from(stats: DispatchStats) -> Self {
        Self {
            cascades: stats.cascades,
            updates: stats.updates,
            writes: stats.writes,
            depth_truncations: stats.depth_truncations,
            overflows: stats.overflows,
            vetoed: stats.vetoed,
        }
    }
}

/// Execution metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total duration (seconds)
    pub duration_seconds: f64,

    /// Simulation ticks stepped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticks_stepped: Option<u64>,

    /// Number of assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,
}

/// Builder for metrics reports
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Create a new builder with a test name
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                commit_hash: None,
                result: TestResult::Pass,
                propagation: None,
                dispatch: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set commit hash
    pub fn commit_hash(mut self, hash: impl Into<String>) -> Self {
        self.report.commit_hash = Some(hash.into());
        self
    }

    /// Set propagation metrics
    pub fn propagation(mut self, metrics: PropagationMetrics) -> Self {
        self.report.propagation = Some(metrics);
        self
    }

    /// Set dispatch metrics
    pub fn dispatch(mut self, metrics: DispatchMetrics) -> Self {
        self.report.dispatch = Some(metrics);
        self
    }

    /// Fill propagation and dispatch metrics from a live engine.
    pub fn engine(self, engine: &RedstoneEngine) -> Self {
        let (hits, misses) = engine.resolver().shape_cache().hit_stats();
        let lookups = hits + misses;
        let mut propagation =
            PropagationMetrics::from_stats(engine.strategy_kind().name(), engine.stats());
        if lookups > 0 {
            propagation.shape_cache_hit_rate = Some(hits as f64 / lookups as f64);
        }
        self.propagation(propagation)
            .dispatch(engine.dispatch_stats().into())
    }

    /// Set execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Build the report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: std::path::PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Write the report
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)
            .with_context(|| format!("Failed to create metrics file {}", self.path.display()))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn metrics_report_roundtrip() {
        let report = MetricsReportBuilder::new("line_of_ten")
            .result(TestResult::Pass)
            .propagation(PropagationMetrics::from_stats(
                "turbo",
                EngineStats {
                    settles: 12,
                    power_writes: 10,
                    network_solves: 1,
                    ..EngineStats::default()
                },
            ))
            .execution(TestExecutionMetrics {
                duration_seconds: 0.5,
                ticks_stepped: Some(20),
                assertions_checked: Some(10),
            })
            .build();

        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: MetricsReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.test_name, "line_of_ten");
        assert_eq!(parsed.result, TestResult::Pass);
        let propagation = parsed.propagation.unwrap();
        assert_eq!(propagation.strategy, "turbo");
        assert_eq!(propagation.power_writes, 10);
        assert!(parsed.dispatch.is_none());
    }

    #[test]
    fn metrics_sink_writes_engine_report() {
        let path = std::env::temp_dir().join(format!(
            "redwire-metrics-{}.json",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));

        let engine = RedstoneEngine::default();
        let report = MetricsReportBuilder::new("sink_test").engine(&engine).build();

        let sink = MetricsSink::create(&path).unwrap();
        sink.write(&report).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("sink_test"));
        assert!(contents.contains("\"result\": \"pass\""));
        assert!(contents.contains("\"strategy\": \"local\""));

        fs::remove_file(&path).ok();
    }
}
