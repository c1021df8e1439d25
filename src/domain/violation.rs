// ==========================================
// 履约中心人力分配系统 - 审计结果模型
// ==========================================
// 红线: 违规是正常输出,不是错误;每次运行重算,不回灌优化器
// ==========================================

use crate::domain::types::{OrderAttribute, Severity};
use serde::{Deserialize, Serialize};

// ==========================================
// ViolationRecord - 违规记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub order_id: String,
    pub class_id: String,
    pub rule_name: String,
    pub observed_value: f64,
    pub threshold: f64,
    pub severity: Severity,
}

// ==========================================
// DriftStats - 工种维度分布漂移统计
// ==========================================
// 描述已分配订单属性相对阈值的偏离程度,不做通过/失败判定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftStats {
    pub class_id: String,
    pub attribute: OrderAttribute,
    pub sample_count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,

    // ===== 阈值相关 (工种未声明阈值时为空) =====
    pub threshold: Option<f64>,
    pub exceed_count: usize,
    pub exceed_ratio: f64,
    pub max_excess: f64,
}

// ==========================================
// AuditReport - 审计报告
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditReport {
    pub violations: Vec<ViolationRecord>,
    pub drift: Vec<DriftStats>,
    pub audited_orders: usize,
}

impl AuditReport {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// 按严重等级计数
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }

    /// 指定订单的违规规则名
    pub fn rules_for_order(&self, order_id: &str) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| v.order_id == order_id)
            .map(|v| v.rule_name.as_str())
            .collect()
    }
}
