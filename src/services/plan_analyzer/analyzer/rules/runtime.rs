//! Runtime statistics rules (N003, N004, N007)
//!
//! These rules only fire on actual plans, where the operator carries UDF timings,
//! actual row counts or per-thread counters.

use super::*;

/// N003: Time spent inside scalar UDFs
pub struct N003UdfExecution;

impl NodeRule for N003UdfExecution {
    fn id(&self) -> &str {
        "N003"
    }
    fn name(&self) -> &str {
        "UDF Execution"
    }

    fn applicable_to(&self, node: &PlanNode) -> bool {
        node.udf_cpu_time_us > 0 || node.udf_elapsed_time_us > 0
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        let cpu_ms = us_to_ms(context.node.udf_cpu_time_us);
        let elapsed_ms = us_to_ms(context.node.udf_elapsed_time_us);
        let severity = if elapsed_ms >= context.thresholds.udf_elapsed_critical_ms {
            WarningSeverity::Critical
        } else {
            WarningSeverity::Warning
        };

        vec![Finding::Warn(PlanWarning::new(
            self.name(),
            format!(
                "Scalar UDFs in this operator used {:.1}ms CPU and {:.1}ms elapsed time.",
                cpu_ms, elapsed_ms
            ),
            severity,
        ))]
    }
}

/// N004: Actual rows far from the estimate
pub struct N004RowEstimateMismatch;

impl NodeRule for N004RowEstimateMismatch {
    fn id(&self) -> &str {
        "N004"
    }
    fn name(&self) -> &str {
        "Row Estimate Mismatch"
    }

    fn applicable_to(&self, node: &PlanNode) -> bool {
        node.has_actual_stats && node.estimate_rows > 0.0
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        let node = context.node;
        let thresholds = context.thresholds;
        let ratio = node.actual_rows / node.estimate_rows;

        let underestimated = ratio >= thresholds.row_estimate_factor;
        if !underestimated && ratio > 1.0 / thresholds.row_estimate_factor {
            return vec![];
        }

        let (factor, direction) =
            if underestimated { (ratio, "underestimated") } else { (1.0 / ratio, "overestimated") };
        let severity = if factor >= thresholds.row_estimate_critical_factor {
            WarningSeverity::Critical
        } else {
            WarningSeverity::Warning
        };

        vec![Finding::Warn(PlanWarning::new(
            self.name(),
            format!(
                "Estimated {:.0} rows but {:.0} rows were returned. Row count {} by {:.0}x.",
                node.estimate_rows, node.actual_rows, direction, factor
            ),
            severity,
        ))]
    }
}

/// N007: One thread handled nearly all rows of a parallel operator
pub struct N007ParallelSkew;

impl NodeRule for N007ParallelSkew {
    fn id(&self) -> &str {
        "N007"
    }
    fn name(&self) -> &str {
        "Parallel Skew"
    }

    fn applicable_to(&self, node: &PlanNode) -> bool {
        node.per_thread_stats.len() > 1
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        let stats = &context.node.per_thread_stats;
        let thresholds = context.thresholds;

        let total: u64 = stats.iter().map(|t| t.actual_rows).sum();
        if total == 0 {
            return vec![];
        }
        // First thread wins ties
        let Some(busiest) = stats
            .iter()
            .fold(None::<&ThreadStat>, |best, t| match best {
                Some(b) if b.actual_rows >= t.actual_rows => Some(b),
                _ => Some(t),
            })
        else {
            return vec![];
        };

        let skew = busiest.actual_rows as f64 / total as f64;
        if skew < thresholds.parallel_skew_ratio
            || stats.len() < thresholds.parallel_skew_min_threads
        {
            return vec![];
        }

        vec![Finding::Warn(PlanWarning::new(
            self.name(),
            format!(
                "Thread {} processed {:.0}% of rows ({} of {}). Work is unevenly distributed across {} threads.",
                busiest.thread_id,
                skew * 100.0,
                busiest.actual_rows,
                total,
                stats.len()
            ),
            WarningSeverity::Warning,
        ))]
    }
}
