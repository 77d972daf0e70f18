//! Side table of analysis results
//!
//! The engine evaluates rules against a shared borrow of the plan and records what it
//! would change, keyed by statement and node position. [`PlanAnnotations::apply`] then
//! merges the results into the tree in one mutable pass.

use super::traversal::for_each_preorder_mut;
use crate::services::plan_analyzer::models::*;
use std::collections::BTreeMap;

/// Position of a statement within the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementKey {
    pub batch: usize,
    pub statement: usize,
}

/// Position of an operator: its statement plus its pre-order index in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub batch: usize,
    pub statement: usize,
    pub node: usize,
}

/// Changes to one operator's warning list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAnnotation {
    /// Warnings to append, in rule order
    pub added: Vec<PlanWarning>,
    /// Indices of pre-existing warnings to raise to critical
    pub escalated: Vec<usize>,
}

impl NodeAnnotation {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.escalated.is_empty()
    }
}

/// Everything one analysis pass adds to a plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanAnnotations {
    pub statements: BTreeMap<StatementKey, Vec<PlanWarning>>,
    pub nodes: BTreeMap<NodeKey, NodeAnnotation>,
    /// Number of operators visited
    pub nodes_visited: usize,
}

impl PlanAnnotations {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.nodes.is_empty()
    }

    /// Number of warnings this pass adds
    pub fn added_count(&self) -> usize {
        self.statements.values().map(Vec::len).sum::<usize>()
            + self.nodes.values().map(|n| n.added.len()).sum::<usize>()
    }

    /// Number of pre-existing warnings this pass escalates
    pub fn escalated_count(&self) -> usize {
        self.nodes.values().map(|n| n.escalated.len()).sum()
    }

    /// Warnings added to a node, if any
    pub fn node_warnings(&self, key: &NodeKey) -> &[PlanWarning] {
        self.nodes.get(key).map(|n| n.added.as_slice()).unwrap_or(&[])
    }

    /// Warnings added to a statement, if any
    pub fn statement_warnings(&self, key: &StatementKey) -> &[PlanWarning] {
        self.statements.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Merge into the plan these annotations were computed from
    ///
    /// Escalations apply to the warnings that existed before the merge; new warnings are
    /// appended after them. Keys that do not match a statement or node are dropped.
    pub fn apply(mut self, plan: &mut ParsedPlan) {
        for (batch_idx, batch) in plan.batches.iter_mut().enumerate() {
            for (stmt_idx, statement) in batch.statements.iter_mut().enumerate() {
                let stmt_key = StatementKey { batch: batch_idx, statement: stmt_idx };
                if let Some(warnings) = self.statements.remove(&stmt_key) {
                    statement.plan_warnings.extend(warnings);
                }

                let Some(root) = statement.root_node.as_mut() else {
                    continue;
                };
                for_each_preorder_mut(root, |node_idx, node| {
                    let key = NodeKey { batch: batch_idx, statement: stmt_idx, node: node_idx };
                    if let Some(annotation) = self.nodes.remove(&key) {
                        for idx in annotation.escalated {
                            if let Some(warning) = node.warnings.get_mut(idx) {
                                warning.severity = WarningSeverity::Critical;
                            }
                        }
                        node.warnings.extend(annotation.added);
                    }
                });
            }
        }

        if !self.is_empty() {
            tracing::warn!(
                "Dropped {} statement and {} node annotations with no matching plan position",
                self.statements.len(),
                self.nodes.len()
            );
        }
    }
}
