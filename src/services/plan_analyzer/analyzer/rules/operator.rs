//! Operator shape rules (N001, N002, N008, N009)
//!
//! Classification uses string equality and substring tests on the operator names. The
//! operator vocabulary is open and versioned, so unknown names simply match nothing.

use super::*;

/// N001: Filter operator with a residual predicate
pub struct N001FilterOperator;

impl NodeRule for N001FilterOperator {
    fn id(&self) -> &str {
        "N001"
    }
    fn name(&self) -> &str {
        "Filter Operator"
    }

    fn applicable_to(&self, node: &PlanNode) -> bool {
        node.physical_op == "Filter"
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        let Some(predicate) = context.display_predicate() else {
            return vec![];
        };
        vec![Finding::Warn(PlanWarning::new(
            self.name(),
            format!(
                "Filter operator discards rows after they were produced. Predicate: {}",
                predicate
            ),
            WarningSeverity::Warning,
        ))]
    }
}

/// N002: Eager index spool building a temporary index at runtime
pub struct N002EagerIndexSpool;

impl NodeRule for N002EagerIndexSpool {
    fn id(&self) -> &str {
        "N002"
    }
    fn name(&self) -> &str {
        "Eager Index Spool"
    }

    fn applicable_to(&self, node: &PlanNode) -> bool {
        node.logical_op == "Eager Spool" && contains_ignore_case(&node.physical_op, "Spool")
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        let mut message = String::from(
            "Eager index spool builds a temporary index on every execution. A permanent index would avoid the rebuild.",
        );
        if let Some(index) = context.node.suggested_index.as_deref().filter(|s| !s.is_empty()) {
            message.push_str(&format!(" Suggested index: {}", index));
        }
        vec![Finding::Warn(PlanWarning::new(self.name(), message, WarningSeverity::Warning))]
    }
}

/// N008: Key or RID lookup evaluating a residual predicate
pub struct N008KeyLookupPredicate;

impl NodeRule for N008KeyLookupPredicate {
    fn id(&self) -> &str {
        "N008"
    }
    fn name(&self) -> &str {
        "Key Lookup"
    }

    fn applicable_to(&self, node: &PlanNode) -> bool {
        node.lookup
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        let Some(predicate) = context.display_predicate() else {
            return vec![];
        };
        vec![Finding::Warn(PlanWarning::new(
            self.name(),
            format!(
                "Lookup filters rows only after fetching them from the base table. Predicate: {}",
                predicate
            ),
            WarningSeverity::Warning,
        ))]
    }
}

/// N009: Scan with a residual predicate
///
/// Spool operators are excluded so that spool scans are not reported twice.
pub struct N009ScanWithPredicate;

impl NodeRule for N009ScanWithPredicate {
    fn id(&self) -> &str {
        "N009"
    }
    fn name(&self) -> &str {
        "Scan With Predicate"
    }

    fn applicable_to(&self, node: &PlanNode) -> bool {
        contains_ignore_case(&node.physical_op, "Scan")
            && !contains_ignore_case(&node.physical_op, "Spool")
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        let Some(predicate) = context.display_predicate() else {
            return vec![];
        };
        vec![Finding::Warn(PlanWarning::new(
            self.name(),
            format!(
                "{} reads every row and applies the predicate afterwards. Predicate: {}",
                context.node.physical_op, predicate
            ),
            WarningSeverity::Warning,
        ))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rule: &dyn NodeRule, node: &PlanNode) -> Vec<PlanWarning> {
        let thresholds = AnalyzerThresholds::default();
        if !rule.applicable_to(node) {
            return vec![];
        }
        rule.evaluate(&NodeRuleContext { node, added: &[], thresholds: &thresholds })
            .into_iter()
            .filter_map(|f| match f {
                Finding::Warn(w) => Some(w),
                Finding::Escalate(_) => None,
            })
            .collect()
    }

    fn with_predicate(physical: &str, logical: &str, predicate: &str) -> PlanNode {
        let mut node = PlanNode::new(physical, logical);
        node.predicate = Some(predicate.to_string());
        node
    }

    #[test]
    fn test_n001_filter_with_predicate() {
        let node = with_predicate("Filter", "Filter", "[t].[a] > 5");
        let warnings = run(&N001FilterOperator, &node);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warning_type, "Filter Operator");
        assert!(warnings[0].message.ends_with("Predicate: [t].[a] > 5"));
    }

    #[test]
    fn test_n001_requires_predicate() {
        assert!(run(&N001FilterOperator, &PlanNode::new("Filter", "Filter")).is_empty());
        assert!(run(&N001FilterOperator, &with_predicate("Filter", "Filter", "")).is_empty());
    }

    #[test]
    fn test_n001_truncates_long_predicate() {
        let predicate = "x".repeat(250);
        let warnings = run(&N001FilterOperator, &with_predicate("Filter", "Filter", &predicate));
        let expected = format!("Predicate: {}...", "x".repeat(200));
        assert!(warnings[0].message.ends_with(&expected));
    }

    #[test]
    fn test_n002_eager_spool_with_suggestion() {
        let mut node = PlanNode::new("Index Spool", "Eager Spool");
        node.suggested_index = Some("CREATE INDEX ix_a ON t (a)".to_string());
        let warnings = run(&N002EagerIndexSpool, &node);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.ends_with("Suggested index: CREATE INDEX ix_a ON t (a)"));
    }

    #[test]
    fn test_n002_requires_eager_logical_op() {
        assert!(run(&N002EagerIndexSpool, &PlanNode::new("Table Spool", "Lazy Spool")).is_empty());
        assert!(run(&N002EagerIndexSpool, &PlanNode::new("Sort", "Eager Spool")).is_empty());
        let upper = PlanNode::new("INDEX SPOOL", "Eager Spool");
        assert_eq!(run(&N002EagerIndexSpool, &upper).len(), 1);
    }

    #[test]
    fn test_n008_lookup_with_predicate() {
        let seek = || with_predicate("Clustered Index Seek", "Clustered Index Seek", "[t].[b] = 1");
        let mut node = seek();
        node.lookup = true;
        assert_eq!(run(&N008KeyLookupPredicate, &node).len(), 1);

        let no_lookup = seek();
        assert!(run(&N008KeyLookupPredicate, &no_lookup).is_empty());
    }

    #[test]
    fn test_n009_scan_with_predicate() {
        let node = with_predicate("Clustered Index Scan", "Clustered Index Scan", "[t].[c] = 2");
        let warnings = run(&N009ScanWithPredicate, &node);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warning_type, "Scan With Predicate");
        assert!(warnings[0].message.starts_with("Clustered Index Scan reads every row"));
    }

    #[test]
    fn test_n009_table_scan_without_predicate() {
        assert!(run(&N009ScanWithPredicate, &PlanNode::new("Table Scan", "Table Scan")).is_empty());
    }

    #[test]
    fn test_n009_skips_spool_scans() {
        let node = with_predicate("Table Spool Scan", "Lazy Spool", "[t].[c] = 2");
        assert!(run(&N009ScanWithPredicate, &node).is_empty());
    }

    #[test]
    fn test_n009_case_insensitive() {
        let node = with_predicate("COLUMNSTORE INDEX SCAN", "Index Scan", "p");
        assert_eq!(run(&N009ScanWithPredicate, &node).len(), 1);
    }
}
