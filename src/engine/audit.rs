// ==========================================
// 履约中心人力分配系统 - 安全审计引擎
// ==========================================
// 红线: 只读只报,不修改分配;违规是正常输出而非错误
// 红线: 违规全量枚举,不截断不抽样
// ==========================================
// 职责: 检出优化模型不可见的物理约束违规 (模型盲区)
// 输入: 分配表 + 订单表 + 规则注册表
// 输出: AuditReport (违规记录 + 分布漂移统计)
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::order::Order;
use crate::domain::types::Severity;
use crate::domain::violation::{AuditReport, ViolationRecord};
use crate::engine::drift::DriftAnalyzer;
use crate::engine::error::{AuditError, AuditResult};
use crate::engine::rules::RuleRegistry;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

// ==========================================
// SafetyAuditor - 安全审计引擎
// ==========================================
pub struct SafetyAuditor {
    registry: RuleRegistry,
    drift: DriftAnalyzer,
}

impl SafetyAuditor {
    /// 构造函数
    ///
    /// # 参数
    /// - `registry`: 已校验的规则注册表
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            drift: DriftAnalyzer::new(),
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 审计分配结果
    ///
    /// 每个 (订单, 所分配工种) 对逐条评估适用规则;
    /// 每个违规的 (订单, 规则) 对恰好产生一条记录。
    /// 订单间相互独立,并行评估;输出按 (order_id, rule_name) 排序。
    ///
    /// # 返回
    /// - Err(UnknownOrder): 分配引用了订单表中不存在的订单
    #[instrument(skip(self, assignments, orders), fields(
        assignment_count = assignments.len(),
        rule_count = self.registry.rules().len()
    ))]
    pub fn audit(&self, assignments: &[Assignment], orders: &[Order]) -> AuditResult<AuditReport> {
        let orders_by_id: HashMap<&str, &Order> =
            orders.iter().map(|o| (o.order_id.as_str(), o)).collect();

        // 1. 引用完整性 (快速失败)
        if let Some(missing) = assignments
            .iter()
            .find(|a| !orders_by_id.contains_key(a.order_id.as_str()))
        {
            return Err(AuditError::UnknownOrder(missing.order_id.clone()));
        }

        // 2. 逐单规则评估 (并行)
        let mut violations: Vec<ViolationRecord> = assignments
            .par_iter()
            .flat_map_iter(|a| {
                let order = orders_by_id[a.order_id.as_str()];
                self.registry
                    .applicable_to(&a.class_id)
                    .filter_map(|rule| rule.evaluate(order, &a.class_id))
                    .collect::<Vec<_>>()
            })
            .collect();
        violations.sort_by(|a, b| {
            a.order_id
                .cmp(&b.order_id)
                .then_with(|| a.rule_name.cmp(&b.rule_name))
        });

        // 3. 分布漂移
        let drift = self.drift.analyze(assignments, &orders_by_id, &self.registry);

        let report = AuditReport {
            violations,
            drift,
            audited_orders: assignments.len(),
        };

        info!(
            violation_count = report.violations.len(),
            critical = report.count_by_severity(Severity::Critical),
            warning = report.count_by_severity(Severity::Warning),
            "安全审计完成"
        );
        for stats in report.drift.iter().filter(|s| s.exceed_count > 0) {
            warn!(
                class_id = %stats.class_id,
                attribute = %stats.attribute,
                threshold = ?stats.threshold,
                exceed_count = stats.exceed_count,
                exceed_ratio = stats.exceed_ratio,
                max = stats.max,
                "已分配订单超出安全阈值"
            );
        }

        Ok(report)
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::worker::WorkerClass;
    use crate::engine::rules::rule_names;

    fn create_test_order(order_id: &str, weight_kg: f64, item_count: u32) -> Order {
        Order {
            order_id: order_id.to_string(),
            weight_kg,
            item_count,
            arrival_timestamp: None,
            required_processing_minutes: item_count as f64,
        }
    }

    fn assign(order_id: &str, class_id: &str) -> Assignment {
        Assignment {
            order_id: order_id.to_string(),
            class_id: class_id.to_string(),
            processing_minutes: 1.0,
            cost: 1.0,
        }
    }

    fn default_auditor() -> SafetyAuditor {
        SafetyAuditor::new(RuleRegistry::from_worker_classes(&WorkerClass::default_classes()))
    }

    #[test]
    fn test_heavy_order_on_robot_is_flagged_once() {
        let auditor = default_auditor();
        let orders = vec![create_test_order("O1", 25.0, 3)];

        let report = auditor.audit(&[assign("O1", "Robot")], &orders).unwrap();

        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.rule_name, rule_names::WEIGHT_LIMIT);
        assert_eq!(v.observed_value, 25.0);
        assert_eq!(v.threshold, 5.0);
        assert_eq!(v.class_id, "Robot");
    }

    #[test]
    fn test_human_exempt_from_weight_rule() {
        let auditor = default_auditor();
        let orders = vec![create_test_order("O1", 25.0, 3)];

        let report = auditor.audit(&[assign("O1", "Human")], &orders).unwrap();
        assert!(!report.has_violations());
    }

    #[test]
    fn test_order_accumulates_multiple_violations() {
        let classes = vec![WorkerClass::new("Robot", 5.0, 480.0)
            .with_max_safe_weight(5.0)
            .with_max_item_count(10)];
        let auditor = SafetyAuditor::new(RuleRegistry::from_worker_classes(&classes));
        let orders = vec![create_test_order("O1", 30.0, 12)];

        let report = auditor.audit(&[assign("O1", "Robot")], &orders).unwrap();

        assert_eq!(
            report.rules_for_order("O1"),
            vec![rule_names::ITEM_COUNT_LIMIT, rule_names::WEIGHT_LIMIT]
        );
    }

    #[test]
    fn test_unknown_order_fails_fast() {
        let auditor = default_auditor();
        let err = auditor.audit(&[assign("GHOST", "Robot")], &[]).unwrap_err();
        assert_eq!(err, AuditError::UnknownOrder("GHOST".to_string()));
    }

    #[test]
    fn test_drift_reported_per_class() {
        let auditor = default_auditor();
        let orders = vec![
            create_test_order("O1", 2.0, 1),
            create_test_order("O2", 8.0, 4),
            create_test_order("O3", 20.0, 10),
        ];
        let assignments = vec![assign("O1", "Robot"), assign("O2", "Robot"), assign("O3", "Human")];

        let report = auditor.audit(&assignments, &orders).unwrap();

        let robot_weight = report
            .drift
            .iter()
            .find(|s| s.class_id == "Robot" && s.attribute == crate::domain::OrderAttribute::WeightKg)
            .unwrap();
        assert_eq!(robot_weight.sample_count, 2);
        assert_eq!(robot_weight.threshold, Some(5.0));
        assert_eq!(robot_weight.exceed_count, 1);
        assert_eq!(robot_weight.max, 8.0);

        let human_weight = report
            .drift
            .iter()
            .find(|s| s.class_id == "Human" && s.attribute == crate::domain::OrderAttribute::WeightKg)
            .unwrap();
        assert_eq!(human_weight.threshold, None);
    }
}
