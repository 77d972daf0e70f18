//! Diagnostic rules module
//!
//! Statement rules (S001-S002) run once per statement. Node rules (N001-N009) run at
//! every operator, in catalog order, as an ordered pipeline: N006 reads the warnings
//! that earlier rules added during the same visit.

pub mod operator;
pub mod runtime;
pub mod spill;
pub mod statement;
pub mod udf;

use super::thresholds::AnalyzerThresholds;
use crate::services::plan_analyzer::models::*;

// ============================================================================
// Rule Traits and Types
// ============================================================================

/// Reference to a warning on the node being visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningRef {
    /// Index into the node's warnings as they were before analysis
    Existing(usize),
    /// Index into the warnings added during this visit
    Added(usize),
}

/// Outcome of a node rule
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// Append a new warning to the node
    Warn(PlanWarning),
    /// Raise an attached warning to critical
    Escalate(WarningRef),
}

/// Context for statement rule evaluation
pub struct StatementRuleContext<'a> {
    pub statement: &'a PlanStatement,
    pub thresholds: &'a AnalyzerThresholds,
}

/// Context for node rule evaluation
pub struct NodeRuleContext<'a> {
    pub node: &'a PlanNode,
    /// Warnings produced by earlier rules at this node during the current visit
    pub added: &'a [PlanWarning],
    pub thresholds: &'a AnalyzerThresholds,
}

impl<'a> NodeRuleContext<'a> {
    /// Non-empty residual predicate of the node
    pub fn predicate(&self) -> Option<&'a str> {
        self.node.predicate.as_deref().filter(|p| !p.is_empty())
    }

    /// Predicate shortened for display
    pub fn display_predicate(&self) -> Option<String> {
        self.predicate()
            .map(|p| truncate_text(p, self.thresholds.predicate_display_chars))
    }

    /// Every warning currently attached to the node, pre-existing ones first
    pub fn attached_warnings(&self) -> impl Iterator<Item = (WarningRef, &'a PlanWarning)> {
        let existing = self
            .node
            .warnings
            .iter()
            .enumerate()
            .map(|(i, w)| (WarningRef::Existing(i), w));
        let added = self.added.iter().enumerate().map(|(i, w)| (WarningRef::Added(i), w));
        existing.chain(added)
    }
}

/// Rule evaluated once per statement
pub trait StatementRule: Send + Sync {
    /// Rule ID (e.g., "S001")
    fn id(&self) -> &str;

    /// Rule name
    fn name(&self) -> &str;

    /// Evaluate the rule and return the warnings it raises
    fn evaluate(&self, context: &StatementRuleContext) -> Vec<PlanWarning>;
}

/// Rule evaluated at every operator node
pub trait NodeRule: Send + Sync {
    /// Rule ID (e.g., "N001")
    fn id(&self) -> &str;

    /// Rule name
    fn name(&self) -> &str;

    /// Check if rule applies to this node
    fn applicable_to(&self, node: &PlanNode) -> bool;

    /// Evaluate the rule and return its findings
    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding>;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Truncate text to `max_chars` characters, appending "..." when shortened
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Case-insensitive substring test for operator names
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Convert microseconds to milliseconds
pub fn us_to_ms(us: u64) -> f64 {
    us as f64 / 1000.0
}

// ============================================================================
// Rule Registry
// ============================================================================

/// Get statement-level rules in evaluation order
pub fn get_statement_rules() -> Vec<Box<dyn StatementRule>> {
    statement::get_rules()
}

/// Get node-level rules in evaluation order
pub fn get_node_rules() -> Vec<Box<dyn NodeRule>> {
    vec![
        Box::new(operator::N001FilterOperator),
        Box::new(operator::N002EagerIndexSpool),
        Box::new(runtime::N003UdfExecution),
        Box::new(runtime::N004RowEstimateMismatch),
        Box::new(udf::N005ScalarUdfReference),
        Box::new(spill::N006SpillEscalation),
        Box::new(runtime::N007ParallelSkew),
        Box::new(operator::N008KeyLookupPredicate),
        Box::new(operator::N009ScanWithPredicate),
    ]
}
