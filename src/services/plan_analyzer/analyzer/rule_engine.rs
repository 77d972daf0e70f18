//! Rule Engine for Plan Diagnostics
//!
//! Walks batches, statements and operator trees, running the statement rules once per
//! statement and the node rule pipeline once per operator.

use super::annotations::{NodeAnnotation, NodeKey, PlanAnnotations, StatementKey};
use super::rules::{
    Finding, NodeRule, NodeRuleContext, StatementRule, StatementRuleContext, WarningRef,
    get_node_rules, get_statement_rules,
};
use super::thresholds::AnalyzerThresholds;
use super::traversal::preorder;
use crate::services::plan_analyzer::models::*;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Rule engine configuration, the `[analyzer]` config section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuleEngineConfig {
    /// Rule ids to skip (e.g. "N009")
    pub disabled_rules: BTreeSet<String>,
    pub thresholds: AnalyzerThresholds,
}

impl RuleEngineConfig {
    pub fn is_disabled(&self, rule_id: &str) -> bool {
        self.disabled_rules.contains(rule_id)
    }
}

/// Rule engine for plan diagnostics
pub struct RuleEngine {
    config: RuleEngineConfig,
    statement_rules: Vec<Box<dyn StatementRule>>,
    node_rules: Vec<Box<dyn NodeRule>>,
}

impl RuleEngine {
    /// Create a new rule engine with default configuration
    pub fn new() -> Self {
        Self::with_config(RuleEngineConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: RuleEngineConfig) -> Self {
        Self { config, statement_rules: get_statement_rules(), node_rules: get_node_rules() }
    }

    /// Analyze a plan and annotate it in place
    ///
    /// Statement warnings are appended to `plan_warnings`, operator warnings to each
    /// node's `warnings`, and heavy spill warnings are raised to critical. Every call
    /// appends again: analyzing the same tree twice duplicates the rule warnings.
    pub fn analyze(&self, plan: &mut ParsedPlan) {
        let annotations = self.diagnose(plan);
        tracing::info!(
            "Plan analysis complete: {} operators visited, {} warnings added, {} escalated",
            annotations.nodes_visited,
            annotations.added_count(),
            annotations.escalated_count()
        );
        annotations.apply(plan);
    }

    /// Evaluate all rules without touching the plan
    pub fn diagnose(&self, plan: &ParsedPlan) -> PlanAnnotations {
        let mut annotations = PlanAnnotations::default();

        for (batch_idx, batch) in plan.batches.iter().enumerate() {
            for (stmt_idx, statement) in batch.statements.iter().enumerate() {
                let warnings = self.diagnose_statement(statement);
                if !warnings.is_empty() {
                    annotations
                        .statements
                        .insert(StatementKey { batch: batch_idx, statement: stmt_idx }, warnings);
                }

                let Some(root) = &statement.root_node else {
                    continue;
                };
                for (node_idx, node) in preorder(root) {
                    annotations.nodes_visited += 1;
                    let annotation = self.diagnose_node(node, node_idx);
                    if !annotation.is_empty() {
                        annotations.nodes.insert(
                            NodeKey { batch: batch_idx, statement: stmt_idx, node: node_idx },
                            annotation,
                        );
                    }
                }
            }
        }

        annotations
    }

    /// Run the statement rules
    fn diagnose_statement(&self, statement: &PlanStatement) -> Vec<PlanWarning> {
        let context = StatementRuleContext { statement, thresholds: &self.config.thresholds };
        let mut warnings = Vec::new();

        for rule in &self.statement_rules {
            if self.config.is_disabled(rule.id()) {
                continue;
            }
            for warning in rule.evaluate(&context) {
                tracing::debug!("Rule {} fired on statement: {}", rule.id(), warning.message);
                warnings.push(warning);
            }
        }

        warnings
    }

    /// Run the node rule pipeline in order
    ///
    /// Each rule sees the warnings added by the rules before it, so escalation covers
    /// both parser-attached warnings and ones raised earlier in the same visit.
    fn diagnose_node(&self, node: &PlanNode, node_idx: usize) -> NodeAnnotation {
        let mut annotation = NodeAnnotation::default();

        for rule in &self.node_rules {
            if self.config.is_disabled(rule.id()) || !rule.applicable_to(node) {
                continue;
            }

            let findings = rule.evaluate(&NodeRuleContext {
                node,
                added: &annotation.added,
                thresholds: &self.config.thresholds,
            });

            for finding in findings {
                match finding {
                    Finding::Warn(warning) => {
                        tracing::debug!(
                            "Rule {} fired on node {} ({}): {}",
                            rule.id(),
                            node_idx,
                            node.physical_op,
                            warning.message
                        );
                        annotation.added.push(warning);
                    },
                    Finding::Escalate(WarningRef::Existing(idx)) => {
                        if !annotation.escalated.contains(&idx) {
                            tracing::debug!(
                                "Rule {} escalated warning {} on node {}",
                                rule.id(),
                                idx,
                                node_idx
                            );
                            annotation.escalated.push(idx);
                        }
                    },
                    Finding::Escalate(WarningRef::Added(idx)) => {
                        if let Some(warning) = annotation.added.get_mut(idx) {
                            warning.severity = WarningSeverity::Critical;
                        }
                    },
                }
            }
        }

        annotation
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
