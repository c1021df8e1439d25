// ==========================================
// 履约中心人力分配系统 - 管理层汇总
// ==========================================
// 口径: 按工种统计订单数、总成本、单均成本、产能利用率
// 违规数来自审计报告,仅做展示
// ==========================================

use crate::domain::assignment::AssignmentPlan;
use crate::domain::types::Severity;
use crate::domain::violation::AuditReport;
use crate::domain::worker::CapacityConstraint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 工种汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub class_id: String,
    pub order_count: usize,
    pub total_cost: f64,
    pub avg_cost_per_order: f64, // 无订单时为 0
    pub used_minutes: f64,
    pub capacity_minutes: f64,
    pub utilization: f64,        // used / capacity
    pub violation_count: usize,
}

/// 管理层汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub run_id: String,
    pub classes: Vec<ClassSummary>,
    pub total_orders: usize,
    pub total_cost: f64,
    pub violation_count: usize,
    pub critical_violation_count: usize,
}

impl ExecutiveSummary {
    /// 由分配方案与审计报告构建 (工种顺序与方案一致)
    pub fn build(plan: &AssignmentPlan, audit: &AuditReport) -> Self {
        let classes = plan
            .class_usage
            .iter()
            .map(|usage| {
                let avg_cost_per_order = if usage.order_count == 0 {
                    0.0
                } else {
                    usage.total_cost / usage.order_count as f64
                };
                ClassSummary {
                    class_id: usage.class_id.clone(),
                    order_count: usage.order_count,
                    total_cost: usage.total_cost,
                    avg_cost_per_order,
                    used_minutes: usage.used_minutes,
                    capacity_minutes: usage.capacity_minutes,
                    utilization: usage.utilization(),
                    violation_count: audit
                        .violations
                        .iter()
                        .filter(|v| v.class_id == usage.class_id)
                        .count(),
                }
            })
            .collect();

        Self {
            run_id: plan.run_id.clone(),
            classes,
            total_orders: plan.assignments.len(),
            total_cost: plan.total_cost,
            violation_count: audit.violations.len(),
            critical_violation_count: audit.count_by_severity(Severity::Critical),
        }
    }

    pub fn class(&self, class_id: &str) -> Option<&ClassSummary> {
        self.classes.iter().find(|c| c.class_id == class_id)
    }
}

impl fmt::Display for ExecutiveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "运行 {}", self.run_id)?;
        writeln!(
            f,
            "{:<10} {:>8} {:>12} {:>10} {:>12} {:>8} {:>6}",
            "工种", "订单数", "总成本", "单均成本", "已用分钟", "利用率", "违规"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:<10} {:>8} {:>12.2} {:>10.4} {:>12.1} {:>7.1}% {:>6}",
                c.class_id,
                c.order_count,
                c.total_cost,
                c.avg_cost_per_order,
                c.used_minutes,
                c.utilization * 100.0,
                c.violation_count
            )?;
        }
        write!(
            f,
            "合计: {} 单, 总成本 {:.2}, 违规 {} 条 (严重 {})",
            self.total_orders, self.total_cost, self.violation_count, self.critical_violation_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assignment::Assignment;
    use crate::domain::violation::ViolationRecord;
    use crate::domain::worker::{CapacityUsage, WorkerClass};
    use chrono::Utc;

    fn sample_plan() -> AssignmentPlan {
        let robot = WorkerClass::new("Robot", 5.0, 480.0);
        let human = WorkerClass::new("Human", 16.0, 600.0);
        let mut robot_usage = CapacityUsage::empty(&robot);
        robot_usage.used_minutes = 120.0;
        robot_usage.order_count = 2;
        robot_usage.total_cost = 10.0;

        AssignmentPlan {
            run_id: "R1".to_string(),
            assignments: vec![
                Assignment {
                    order_id: "1".to_string(),
                    class_id: "Robot".to_string(),
                    processing_minutes: 60.0,
                    cost: 5.0,
                },
                Assignment {
                    order_id: "2".to_string(),
                    class_id: "Robot".to_string(),
                    processing_minutes: 60.0,
                    cost: 5.0,
                },
            ],
            total_cost: 10.0,
            class_usage: vec![robot_usage, CapacityUsage::empty(&human)],
            solve_duration_ms: 3,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_summary() {
        let audit = AuditReport {
            violations: vec![ViolationRecord {
                order_id: "1".to_string(),
                class_id: "Robot".to_string(),
                rule_name: "weight_limit".to_string(),
                observed_value: 9.0,
                threshold: 5.0,
                severity: Severity::Critical,
            }],
            drift: Vec::new(),
            audited_orders: 2,
        };

        let summary = ExecutiveSummary::build(&sample_plan(), &audit);

        let robot = summary.class("Robot").unwrap();
        assert_eq!(robot.order_count, 2);
        assert_eq!(robot.avg_cost_per_order, 5.0);
        assert_eq!(robot.utilization, 0.25);
        assert_eq!(robot.violation_count, 1);

        let human = summary.class("Human").unwrap();
        assert_eq!(human.order_count, 0);
        assert_eq!(human.avg_cost_per_order, 0.0);

        assert_eq!(summary.total_cost, 10.0);
        assert_eq!(summary.critical_violation_count, 1);
        assert!(summary.to_string().contains("Robot"));
    }
}
