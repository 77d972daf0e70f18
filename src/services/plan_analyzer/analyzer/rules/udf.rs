//! Scalar UDF reference rule (N005)

use super::*;

/// N005: Operator calls a scalar user-defined function
///
/// Emits one warning per referenced function.
pub struct N005ScalarUdfReference;

impl NodeRule for N005ScalarUdfReference {
    fn id(&self) -> &str {
        "N005"
    }
    fn name(&self) -> &str {
        "Scalar UDF"
    }

    fn applicable_to(&self, node: &PlanNode) -> bool {
        !node.scalar_udfs.is_empty()
    }

    fn evaluate(&self, context: &NodeRuleContext) -> Vec<Finding> {
        context
            .node
            .scalar_udfs
            .iter()
            .map(|udf| {
                let kind = if udf.is_clr_function { "CLR" } else { "T-SQL" };
                Finding::Warn(PlanWarning::new(
                    self.name(),
                    format!(
                        "{} scalar function {} is called for every row and may prevent parallelism.",
                        kind, udf.function_name
                    ),
                    WarningSeverity::Warning,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n005_one_warning_per_udf() {
        let mut node = PlanNode::new("Compute Scalar", "Compute Scalar");
        node.scalar_udfs = vec![
            ScalarUdf { function_name: "dbo.fn_Tax".to_string(), is_clr_function: false },
            ScalarUdf { function_name: "dbo.RegexMatch".to_string(), is_clr_function: true },
        ];
        let thresholds = AnalyzerThresholds::default();
        let rule = N005ScalarUdfReference;
        assert!(rule.applicable_to(&node));

        let findings =
            rule.evaluate(&NodeRuleContext { node: &node, added: &[], thresholds: &thresholds });
        assert_eq!(findings.len(), 2);

        let messages: Vec<String> = findings
            .into_iter()
            .map(|f| match f {
                Finding::Warn(w) => {
                    assert_eq!(w.severity, WarningSeverity::Warning);
                    w.message
                },
                Finding::Escalate(_) => panic!("N005 never escalates"),
            })
            .collect();
        assert!(messages[0].starts_with("T-SQL scalar function dbo.fn_Tax"));
        assert!(messages[1].starts_with("CLR scalar function dbo.RegexMatch"));
    }

    #[test]
    fn test_n005_not_applicable_without_udfs() {
        assert!(!N005ScalarUdfReference.applicable_to(&PlanNode::default()));
    }
}
