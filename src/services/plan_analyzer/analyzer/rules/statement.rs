//! Statement-level diagnostic rules (S001-S002)
//!
//! Rules that evaluate statement attributes rather than operators.

use super::*;

/// Human phrasing for known non-parallel plan reason codes
pub fn serial_reason_phrase(code: &str) -> &str {
    match code {
        "MaxDOPSetToOne" => "MAXDOP is set to 1",
        "EstimatedDOPIsOne" => "Estimated DOP is 1",
        "NoParallelPlansInDesktopOrExpressEdition" => {
            "Express/Desktop edition does not support parallelism"
        },
        "CouldNotGenerateValidParallelPlan" => "Optimizer could not generate a valid parallel plan",
        "QueryHintNoParallelSet" => "OPTION (MAXDOP 1) hint forces serial execution",
        other => other,
    }
}

/// S001: Query forced to run serially
pub struct S001SerialPlan;

impl StatementRule for S001SerialPlan {
    fn id(&self) -> &str {
        "S001"
    }
    fn name(&self) -> &str {
        "Serial Plan"
    }

    fn evaluate(&self, context: &StatementRuleContext) -> Vec<PlanWarning> {
        let Some(reason) = context
            .statement
            .non_parallel_plan_reason
            .as_deref()
            .filter(|r| !r.is_empty())
        else {
            return vec![];
        };

        vec![PlanWarning::new(
            self.name(),
            format!("Query forced to run serially: {}", serial_reason_phrase(reason)),
            WarningSeverity::Warning,
        )]
    }
}

/// S002: Memory grant oversized or delayed
///
/// Raises up to two warnings: "Excessive Memory Grant" when the grant dwarfs the memory
/// actually used, and "Memory Grant Wait" when the query queued for its grant.
pub struct S002MemoryGrant;

impl StatementRule for S002MemoryGrant {
    fn id(&self) -> &str {
        "S002"
    }
    fn name(&self) -> &str {
        "Memory Grant"
    }

    fn evaluate(&self, context: &StatementRuleContext) -> Vec<PlanWarning> {
        let Some(grant) = context.statement.memory_grant else {
            return vec![];
        };
        let thresholds = context.thresholds;
        let mut warnings = Vec::new();

        if grant.granted_memory_kb > 0 && grant.max_used_memory_kb > 0 {
            let waste_ratio = grant.granted_memory_kb as f64 / grant.max_used_memory_kb as f64;
            if waste_ratio >= thresholds.excessive_grant_ratio
                && grant.granted_memory_kb > thresholds.excessive_grant_min_kb
            {
                warnings.push(PlanWarning::new(
                    "Excessive Memory Grant",
                    format!(
                        "Granted {} KB but only used {} KB ({:.0}x overestimate). Wasted memory blocks other queries.",
                        grant.granted_memory_kb, grant.max_used_memory_kb, waste_ratio
                    ),
                    WarningSeverity::Warning,
                ));
            }
        }

        if grant.grant_wait_time_ms > 0 {
            let severity = if grant.grant_wait_time_ms >= thresholds.grant_wait_critical_ms {
                WarningSeverity::Critical
            } else {
                WarningSeverity::Warning
            };
            warnings.push(PlanWarning::new(
                "Memory Grant Wait",
                format!(
                    "Query waited {}ms for a memory grant. Server may be under memory pressure.",
                    grant.grant_wait_time_ms
                ),
                severity,
            ));
        }

        warnings
    }
}

pub fn get_rules() -> Vec<Box<dyn StatementRule>> {
    vec![Box::new(S001SerialPlan), Box::new(S002MemoryGrant)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(rule: &dyn StatementRule, statement: &PlanStatement) -> Vec<PlanWarning> {
        let thresholds = AnalyzerThresholds::default();
        rule.evaluate(&StatementRuleContext { statement, thresholds: &thresholds })
    }

    fn grant(granted: u64, used: u64, wait: u64) -> PlanStatement {
        PlanStatement {
            memory_grant: Some(MemoryGrantInfo {
                granted_memory_kb: granted,
                max_used_memory_kb: used,
                grant_wait_time_ms: wait,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_s001_known_reason() {
        let statement = PlanStatement {
            non_parallel_plan_reason: Some("MaxDOPSetToOne".to_string()),
            ..Default::default()
        };
        let warnings = evaluate(&S001SerialPlan, &statement);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warning_type, "Serial Plan");
        assert_eq!(warnings[0].message, "Query forced to run serially: MAXDOP is set to 1");
        assert_eq!(warnings[0].severity, WarningSeverity::Warning);
    }

    #[test]
    fn test_s001_unknown_reason_passes_through() {
        let reason = "TableVariableTransactionsDoNotSupportParallelNestedTransaction";
        let statement = PlanStatement {
            non_parallel_plan_reason: Some(reason.to_string()),
            ..Default::default()
        };
        let warnings = evaluate(&S001SerialPlan, &statement);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0]
            .message
            .ends_with("TableVariableTransactionsDoNotSupportParallelNestedTransaction"));
    }

    #[test]
    fn test_s001_empty_reason_ignored() {
        let statement =
            PlanStatement { non_parallel_plan_reason: Some(String::new()), ..Default::default() };
        assert!(evaluate(&S001SerialPlan, &statement).is_empty());
        assert!(evaluate(&S001SerialPlan, &PlanStatement::default()).is_empty());
    }

    #[test]
    fn test_serial_reason_phrases() {
        assert_eq!(serial_reason_phrase("EstimatedDOPIsOne"), "Estimated DOP is 1");
        assert_eq!(
            serial_reason_phrase("QueryHintNoParallelSet"),
            "OPTION (MAXDOP 1) hint forces serial execution"
        );
        assert_eq!(
            serial_reason_phrase("NoParallelPlansInDesktopOrExpressEdition"),
            "Express/Desktop edition does not support parallelism"
        );
    }

    #[test]
    fn test_s002_excessive_grant() {
        let warnings = evaluate(&S002MemoryGrant, &grant(20480, 1024, 0));

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warning_type, "Excessive Memory Grant");
        assert_eq!(warnings[0].severity, WarningSeverity::Warning);
        assert!(warnings[0].message.contains("20x overestimate"));
        assert!(warnings[0].message.starts_with("Granted 20480 KB but only used 1024 KB"));
    }

    #[test]
    fn test_s002_small_grant_not_excessive() {
        // Ratio 100 but the grant is only 1 MB
        assert!(evaluate(&S002MemoryGrant, &grant(1024, 10, 0)).is_empty());
        // Large grant but ratio below 10
        assert!(evaluate(&S002MemoryGrant, &grant(20480, 4096, 0)).is_empty());
        // Unreported usage
        assert!(evaluate(&S002MemoryGrant, &grant(20480, 0, 0)).is_empty());
    }

    #[test]
    fn test_s002_grant_wait_severity_boundary() {
        let below = evaluate(&S002MemoryGrant, &grant(0, 0, 4999));
        assert_eq!(below.len(), 1);
        assert_eq!(below[0].warning_type, "Memory Grant Wait");
        assert_eq!(below[0].severity, WarningSeverity::Warning);

        let at = evaluate(&S002MemoryGrant, &grant(0, 0, 5000));
        assert_eq!(at[0].severity, WarningSeverity::Critical);

        let above = evaluate(&S002MemoryGrant, &grant(0, 0, 6000));
        assert_eq!(above[0].severity, WarningSeverity::Critical);
        assert_eq!(
            above[0].message,
            "Query waited 6000ms for a memory grant. Server may be under memory pressure."
        );
    }

    #[test]
    fn test_s002_both_warnings() {
        let warnings = evaluate(&S002MemoryGrant, &grant(40960, 1024, 100));
        let types: Vec<&str> = warnings.iter().map(|w| w.warning_type.as_str()).collect();
        assert_eq!(types, vec!["Excessive Memory Grant", "Memory Grant Wait"]);
    }
}
