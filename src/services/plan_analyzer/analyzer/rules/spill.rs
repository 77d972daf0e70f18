//! Spill escalation rule (N006)
//!
//! Spill warnings are attached by the plan parser, not by this catalog. The rule only
//! raises their severity; it never creates a warning of its own.

use super::*;

/// N006: Escalate spills with heavy TempDB writes to critical
pub struct N006SpillEscalation;

impl NodeRule for N006SpillEscalation {
    fn id(&self) -> &str {
        "N006"
    }
    fn name(&self) -> &str {
        "Spill Escalation"
    }

    fn applicable_to(&self, _node: &PlanNode) -> bool {
        true // Warnings added earlier in the visit may carry spill details
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        let limit = context.thresholds.spill_critical_writes;
        context
            .attached_warnings()
            .filter(|(_, w)| w.spill_details.is_some_and(|s| s.writes_to_temp_db > limit))
            .map(|(target, _)| Finding::Escalate(target))
            .collect()
    }
}
