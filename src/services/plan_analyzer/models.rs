//! Execution plan data models
//!
//! These models represent the operator tree produced by the upstream showplan parser.
//! The analyzer reads them and appends warnings in place. They serialize with camelCase
//! field names so an annotated plan can be exported as JSON for the diagnostics panel.

use serde::{Deserialize, Serialize};

// ============================================================================
// Plan Structure
// ============================================================================

/// Root of a parsed plan document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedPlan {
    pub batches: Vec<Batch>,
}

impl ParsedPlan {
    /// Iterate every statement across all batches, in declaration order
    pub fn statements(&self) -> impl Iterator<Item = &PlanStatement> {
        self.batches.iter().flat_map(|b| b.statements.iter())
    }

    /// Total number of warnings attached to statements and nodes
    pub fn warning_count(&self) -> usize {
        self.statements()
            .map(|s| {
                s.plan_warnings.len() + s.root_node.as_ref().map_or(0, PlanNode::warning_count)
            })
            .sum()
    }
}

/// A batch of statements submitted together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Batch {
    pub statements: Vec<PlanStatement>,
}

/// Plan of a single SQL statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanStatement {
    /// Statement text, carried for reports only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_text: Option<String>,
    /// Machine code explaining why the optimizer produced a serial plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_parallel_plan_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_grant: Option<MemoryGrantInfo>,
    /// Absent for statements without a compiled plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_node: Option<PlanNode>,
    pub plan_warnings: Vec<PlanWarning>,
}

/// Memory grant of a statement, in KB and ms. Zero means "not reported".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryGrantInfo {
    #[serde(rename = "grantedMemoryKB")]
    pub granted_memory_kb: u64,
    #[serde(rename = "maxUsedMemoryKB")]
    pub max_used_memory_kb: u64,
    pub grant_wait_time_ms: u64,
}

// ============================================================================
// Operator Tree
// ============================================================================

/// One operator in the plan tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    /// Operator id as emitted by the plan format
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub node_id: Option<i32>,
    #[serde(default)]
    pub physical_op: String,
    #[serde(default)]
    pub logical_op: String,
    /// Residual predicate evaluated on already-fetched rows
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub predicate: Option<String>,
    /// Advisory index text carried from the plan document
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub suggested_index: Option<String>,

    // Runtime statistics, only populated for actual plans
    #[serde(default)]
    pub udf_cpu_time_us: u64,
    #[serde(default)]
    pub udf_elapsed_time_us: u64,
    #[serde(default)]
    pub has_actual_stats: bool,
    #[serde(default)]
    pub estimate_rows: f64,
    #[serde(default)]
    pub actual_rows: f64,
    #[serde(default)]
    pub per_thread_stats: Vec<ThreadStat>,

    #[serde(default)]
    pub scalar_udfs: Vec<ScalarUdf>,
    /// True for key/RID lookup operators
    #[serde(default)]
    pub lookup: bool,
    #[serde(default)]
    pub children: Vec<PlanNode>,
    /// May already hold parser-produced warnings (e.g. spills) before analysis
    #[serde(default)]
    pub warnings: Vec<PlanWarning>,
}

impl PlanNode {
    /// Create a node with the given operator names
    pub fn new(physical_op: impl Into<String>, logical_op: impl Into<String>) -> Self {
        Self {
            node_id: None,
            physical_op: physical_op.into(),
            logical_op: logical_op.into(),
            predicate: None,
            suggested_index: None,
            udf_cpu_time_us: 0,
            udf_elapsed_time_us: 0,
            has_actual_stats: false,
            estimate_rows: 0.0,
            actual_rows: 0.0,
            per_thread_stats: Vec::new(),
            scalar_udfs: Vec::new(),
            lookup: false,
            children: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Label used in reports, e.g. "Clustered Index Scan (node 3)"
    pub fn display_name(&self) -> String {
        match self.node_id {
            Some(id) => format!("{} (node {})", self.physical_op, id),
            None => self.physical_op.clone(),
        }
    }

    /// Warnings on this node and all of its descendants
    pub fn warning_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += node.warnings.len();
            stack.extend(node.children.iter());
        }
        count
    }
}

// Deep operator chains would overflow the stack under the derived recursive drop
impl Drop for PlanNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Scalar user-defined function referenced by an operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalarUdf {
    pub function_name: String,
    pub is_clr_function: bool,
}

/// Rows processed by one worker thread of a parallel operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadStat {
    pub thread_id: i32,
    pub actual_rows: u64,
}

// ============================================================================
// Warnings
// ============================================================================

/// Severity of a plan warning
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum WarningSeverity {
    #[default]
    Warning,
    Critical,
}

impl std::fmt::Display for WarningSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningSeverity::Warning => write!(f, "Warning"),
            WarningSeverity::Critical => write!(f, "Critical"),
        }
    }
}

/// A structured warning attached to a statement or an operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanWarning {
    /// Category label, e.g. "Parallel Skew"
    pub warning_type: String,
    pub message: String,
    pub severity: WarningSeverity,
    /// Only set by producers outside the rule catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spill_details: Option<SpillDetails>,
}

impl PlanWarning {
    pub fn new(
        warning_type: impl Into<String>,
        message: impl Into<String>,
        severity: WarningSeverity,
    ) -> Self {
        Self {
            warning_type: warning_type.into(),
            message: message.into(),
            severity,
            spill_details: None,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == WarningSeverity::Critical
    }
}

/// Spill counters attached to a warning by the plan parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpillDetails {
    pub writes_to_temp_db: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_count_includes_descendants() {
        let mut root = PlanNode::new("Nested Loops", "Inner Join");
        let mut child = PlanNode::new("Sort", "Sort");
        child.warnings.push(PlanWarning::new("Spill", "spilled", WarningSeverity::Warning));
        root.children.push(child);
        root.warnings.push(PlanWarning::new("Other", "x", WarningSeverity::Critical));

        let plan = ParsedPlan {
            batches: vec![Batch {
                statements: vec![PlanStatement {
                    root_node: Some(root),
                    plan_warnings: vec![PlanWarning::default()],
                    ..Default::default()
                }],
            }],
        };

        assert_eq!(plan.warning_count(), 3);
    }

    #[test]
    fn test_sparse_json_deserializes_with_defaults() {
        let json = r#"{"batches":[{"statements":[{"rootNode":{"physicalOp":"Table Scan"}}]}]}"#;
        let plan: ParsedPlan = serde_json::from_str(json).unwrap();
        let node = plan.statements().next().unwrap().root_node.as_ref().unwrap();

        assert_eq!(node.physical_op, "Table Scan");
        assert!(node.logical_op.is_empty());
        assert!(node.predicate.is_none());
        assert!(!node.has_actual_stats);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_memory_grant_wire_names() {
        let json = r#"{"grantedMemoryKB":2048,"maxUsedMemoryKB":100,"grantWaitTimeMs":5}"#;
        let grant: MemoryGrantInfo = serde_json::from_str(json).unwrap();
        assert_eq!(grant.granted_memory_kb, 2048);
        assert_eq!(grant.max_used_memory_kb, 100);
        assert_eq!(grant.grant_wait_time_ms, 5);
    }

    #[test]
    fn test_deep_chain_drops_without_overflow() {
        let mut node = PlanNode::new("Table Scan", "Table Scan");
        for _ in 0..200_000 {
            let mut parent = PlanNode::new("Nested Loops", "Inner Join");
            parent.children.push(node);
            node = parent;
        }
        assert_eq!(node.warning_count(), 0);
        drop(node);
    }

    #[test]
    fn test_display_name() {
        let mut node = PlanNode::new("Clustered Index Scan", "Clustered Index Scan");
        assert_eq!(node.display_name(), "Clustered Index Scan");
        node.node_id = Some(3);
        assert_eq!(node.display_name(), "Clustered Index Scan (node 3)");
    }
}
