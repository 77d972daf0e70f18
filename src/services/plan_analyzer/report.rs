//! Summary and text rendering of an annotated plan

use super::analyzer::traversal::preorder;
use super::models::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Warning counts over an annotated plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub statement_count: usize,
    pub operator_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    /// Warning count per warning type
    pub by_type: BTreeMap<String, usize>,
}

impl AnalysisSummary {
    /// Count every warning in the plan, statement and operator level
    pub fn from_plan(plan: &ParsedPlan) -> Self {
        let mut summary = Self::default();

        for statement in plan.statements() {
            summary.statement_count += 1;
            summary.record(&statement.plan_warnings);
            if let Some(root) = &statement.root_node {
                for (_, node) in preorder(root) {
                    summary.operator_count += 1;
                    summary.record(&node.warnings);
                }
            }
        }

        summary
    }

    fn record(&mut self, warnings: &[PlanWarning]) {
        for warning in warnings {
            self.warning_count += 1;
            if warning.is_critical() {
                self.critical_count += 1;
            }
            *self.by_type.entry(warning.warning_type.clone()).or_insert(0) += 1;
        }
    }

    /// Warnings that are not critical
    pub fn non_critical_count(&self) -> usize {
        self.warning_count.saturating_sub(self.critical_count)
    }

    /// Plan health score (0-100) based on warning severities
    pub fn health_score(&self) -> f64 {
        let penalty = self.critical_count as f64 * 20.0 + self.non_critical_count() as f64 * 10.0;
        (100.0 - penalty).max(0.0)
    }

    /// One-line conclusion for the report header
    pub fn conclusion(&self) -> String {
        if self.warning_count == 0 {
            return "No plan warnings found.".to_string();
        }

        let most_common = self
            .by_type
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(t, _)| t.as_str())
            .unwrap_or("unknown");

        if self.critical_count > 0 {
            format!(
                "{} critical and {} other warnings. Most frequent: {}. Address critical warnings first.",
                self.critical_count,
                self.non_critical_count(),
                most_common
            )
        } else {
            format!("{} warnings. Most frequent: {}.", self.warning_count, most_common)
        }
    }
}

/// Render an annotated plan as plain text
pub fn render_text(plan: &ParsedPlan, label: &str) -> String {
    let summary = AnalysisSummary::from_plan(plan);
    let mut out = String::new();

    let _ = writeln!(out, "== {} ==", label);
    let _ = writeln!(
        out,
        "{} statements, {} operators, score {:.0}/100",
        summary.statement_count,
        summary.operator_count,
        summary.health_score()
    );
    let _ = writeln!(out, "{}", summary.conclusion());

    for (batch_idx, batch) in plan.batches.iter().enumerate() {
        for (stmt_idx, statement) in batch.statements.iter().enumerate() {
            let _ = writeln!(out);
            match &statement.statement_text {
                Some(text) => {
                    let _ = writeln!(
                        out,
                        "Statement {}.{}: {}",
                        batch_idx + 1,
                        stmt_idx + 1,
                        first_line(text)
                    );
                },
                None => {
                    let _ = writeln!(out, "Statement {}.{}", batch_idx + 1, stmt_idx + 1);
                },
            }

            for warning in &statement.plan_warnings {
                write_warning(&mut out, "  ", warning);
            }
            if let Some(root) = &statement.root_node {
                for (_, node) in preorder(root) {
                    if node.warnings.is_empty() {
                        continue;
                    }
                    let _ = writeln!(out, "  {}:", node.display_name());
                    for warning in &node.warnings {
                        write_warning(&mut out, "    ", warning);
                    }
                }
            }
        }
    }

    out
}

fn write_warning(out: &mut String, indent: &str, warning: &PlanWarning) {
    let _ = writeln!(
        out,
        "{}[{}] {}: {}",
        indent, warning.severity, warning.warning_type, warning.message
    );
}

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> ParsedPlan {
        let mut root = PlanNode::new("Hash Match", "Inner Join");
        root.node_id = Some(0);
        root.warnings.push(PlanWarning::new("Parallel Skew", "skewed", WarningSeverity::Warning));
        let mut child = PlanNode::new("Sort", "Sort");
        child.warnings.push(PlanWarning::new("Sort Spill", "spilled", WarningSeverity::Critical));
        child.warnings.push(PlanWarning::new("Parallel Skew", "skewed", WarningSeverity::Warning));
        root.children.push(child);

        ParsedPlan {
            batches: vec![Batch {
                statements: vec![PlanStatement {
                    statement_text: Some("\n  SELECT *\n  FROM t".to_string()),
                    root_node: Some(root),
                    plan_warnings: vec![PlanWarning::new(
                        "Serial Plan",
                        "Query forced to run serially: MAXDOP is set to 1",
                        WarningSeverity::Warning,
                    )],
                    ..Default::default()
                }],
            }],
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = AnalysisSummary::from_plan(&sample_plan());
        assert_eq!(summary.statement_count, 1);
        assert_eq!(summary.operator_count, 2);
        assert_eq!(summary.warning_count, 4);
        assert_eq!(summary.critical_count, 1);
        assert_eq!(summary.by_type.get("Parallel Skew"), Some(&2));
        assert_eq!(summary.health_score(), 50.0);
    }

    #[test]
    fn test_conclusion() {
        assert_eq!(AnalysisSummary::default().conclusion(), "No plan warnings found.");
        let conclusion = AnalysisSummary::from_plan(&sample_plan()).conclusion();
        assert!(conclusion.starts_with("1 critical and 3 other warnings"));
        assert!(conclusion.contains("Most frequent: Parallel Skew"));
    }

    #[test]
    fn test_health_score_floor() {
        let summary = AnalysisSummary { warning_count: 8, critical_count: 8, ..Default::default() };
        assert_eq!(summary.health_score(), 0.0);
    }

    #[test]
    fn test_inconsistent_counts_do_not_underflow() {
        let summary = AnalysisSummary { warning_count: 1, critical_count: 3, ..Default::default() };
        assert_eq!(summary.non_critical_count(), 0);
        assert_eq!(summary.health_score(), 40.0);
        assert!(summary.conclusion().starts_with("3 critical and 0 other warnings"));
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&sample_plan(), "sample.json");
        assert!(text.starts_with("== sample.json ==\n"));
        assert!(text.contains("Statement 1.1: SELECT *"));
        assert!(text.contains("  [Warning] Serial Plan: Query forced to run serially"));
        assert!(text.contains("  Hash Match (node 0):\n    [Warning] Parallel Skew: skewed"));
        assert!(text.contains("  Sort:\n    [Critical] Sort Spill: spilled"));
    }
}
