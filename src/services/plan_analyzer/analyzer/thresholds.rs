//! Thresholds for plan diagnostics
//!
//! Every rule reads its cutoffs from [`AnalyzerThresholds`]. The defaults match the
//! fixed values of the rule catalog; the configuration file may override them.

use serde::Deserialize;

/// Default threshold values
pub mod defaults {
    /// Granted/used ratio at which a memory grant counts as excessive
    pub const EXCESSIVE_GRANT_RATIO: f64 = 10.0;

    /// Grants at or below this size (KB) are never reported as excessive
    pub const EXCESSIVE_GRANT_MIN_KB: u64 = 1024;

    /// Grant wait (ms) at which the wait warning becomes critical
    pub const GRANT_WAIT_CRITICAL_MS: u64 = 5000;

    /// Maximum predicate length shown in messages
    pub const PREDICATE_DISPLAY_CHARS: usize = 200;

    /// UDF elapsed time (ms) at which the UDF warning becomes critical
    pub const UDF_ELAPSED_CRITICAL_MS: f64 = 1000.0;

    /// Actual/estimate factor at which a row estimate counts as wrong
    pub const ROW_ESTIMATE_FACTOR: f64 = 10.0;

    /// Factor at which a row estimate mismatch becomes critical
    pub const ROW_ESTIMATE_CRITICAL_FACTOR: f64 = 100.0;

    /// TempDB writes above which a spill warning is escalated
    pub const SPILL_CRITICAL_WRITES: i64 = 1000;

    /// Share of all rows handled by a single thread that counts as skew
    pub const PARALLEL_SKEW_RATIO: f64 = 0.9;

    /// Minimum thread count for skew detection
    pub const PARALLEL_SKEW_MIN_THREADS: usize = 4;
}

/// Rule thresholds, deserializable from the `[analyzer.thresholds]` config section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerThresholds {
    pub excessive_grant_ratio: f64,
    #[serde(deserialize_with = "crate::config::deserialize_size_kb")]
    pub excessive_grant_min_kb: u64,
    #[serde(deserialize_with = "crate::config::deserialize_duration_ms")]
    pub grant_wait_critical_ms: u64,
    pub predicate_display_chars: usize,
    pub udf_elapsed_critical_ms: f64,
    pub row_estimate_factor: f64,
    pub row_estimate_critical_factor: f64,
    pub spill_critical_writes: i64,
    pub parallel_skew_ratio: f64,
    pub parallel_skew_min_threads: usize,
}

impl Default for AnalyzerThresholds {
    fn default() -> Self {
        Self {
            excessive_grant_ratio: defaults::EXCESSIVE_GRANT_RATIO,
            excessive_grant_min_kb: defaults::EXCESSIVE_GRANT_MIN_KB,
            grant_wait_critical_ms: defaults::GRANT_WAIT_CRITICAL_MS,
            predicate_display_chars: defaults::PREDICATE_DISPLAY_CHARS,
            udf_elapsed_critical_ms: defaults::UDF_ELAPSED_CRITICAL_MS,
            row_estimate_factor: defaults::ROW_ESTIMATE_FACTOR,
            row_estimate_critical_factor: defaults::ROW_ESTIMATE_CRITICAL_FACTOR,
            spill_critical_writes: defaults::SPILL_CRITICAL_WRITES,
            parallel_skew_ratio: defaults::PARALLEL_SKEW_RATIO,
            parallel_skew_min_threads: defaults::PARALLEL_SKEW_MIN_THREADS,
        }
    }
}

impl AnalyzerThresholds {
    /// Check that every threshold is usable
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.excessive_grant_ratio <= 1.0 {
            anyhow::bail!("analyzer.thresholds.excessive_grant_ratio must be > 1");
        }
        if self.row_estimate_factor <= 1.0 {
            anyhow::bail!("analyzer.thresholds.row_estimate_factor must be > 1");
        }
        if self.row_estimate_critical_factor < self.row_estimate_factor {
            anyhow::bail!(
                "analyzer.thresholds.row_estimate_critical_factor must be >= row_estimate_factor"
            );
        }
        if !(self.parallel_skew_ratio > 0.0 && self.parallel_skew_ratio <= 1.0) {
            anyhow::bail!("analyzer.thresholds.parallel_skew_ratio must be in (0, 1]");
        }
        if self.parallel_skew_min_threads < 2 {
            anyhow::bail!("analyzer.thresholds.parallel_skew_min_threads must be >= 2");
        }
        if self.predicate_display_chars == 0 {
            anyhow::bail!("analyzer.thresholds.predicate_display_chars must be > 0");
        }
        Ok(())
    }
}
