// ==========================================
// 履约中心人力分配系统 - 工种与产能模型
// ==========================================
// 红线: 产能约束由优化器强制,安全阈值仅供审计
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// WorkerClass - 工种 (机器人/人工)
// ==========================================
// 每次运行的静态输入,优化过程中不修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerClass {
    pub class_id: String,              // 工种代码
    pub cost_per_hour: f64,            // 小时成本 (工资或运行成本)
    pub max_capacity_minutes: f64,     // 班次产能上限 (分钟)

    // ===== 审计阈值 (优化模型不可见) =====
    #[serde(default)]
    pub max_safe_weight_kg: Option<f64>, // 安全承重上限
    #[serde(default)]
    pub max_item_count: Option<u32>,   // 单件数上限
}

impl WorkerClass {
    pub fn new(class_id: &str, cost_per_hour: f64, max_capacity_minutes: f64) -> Self {
        Self {
            class_id: class_id.to_string(),
            cost_per_hour,
            max_capacity_minutes,
            max_safe_weight_kg: None,
            max_item_count: None,
        }
    }

    pub fn with_max_safe_weight(mut self, max_safe_weight_kg: f64) -> Self {
        self.max_safe_weight_kg = Some(max_safe_weight_kg);
        self
    }

    pub fn with_max_item_count(mut self, max_item_count: u32) -> Self {
        self.max_item_count = Some(max_item_count);
        self
    }

    /// 分钟成本 = 小时成本 / 60
    pub fn cost_per_minute(&self) -> f64 {
        self.cost_per_hour / 60.0
    }

    /// 处理指定分钟数的成本
    pub fn cost_for(&self, minutes: f64) -> f64 {
        minutes * self.cost_per_minute()
    }

    /// 默认工种配置
    ///
    /// - Robot: 仅计电费/维护, 1 台 × 8 小时, 承重 5kg
    /// - Human: 临时工, 产能视为无限 (9999 小时), 单单件数上限 40
    pub fn default_classes() -> Vec<WorkerClass> {
        vec![
            WorkerClass::new("Robot", 5.0, 8.0 * 60.0).with_max_safe_weight(5.0),
            WorkerClass::new("Human", 16.0, 9999.0 * 60.0).with_max_item_count(40),
        ]
    }
}

// ==========================================
// CapacityUsage - 工种产能占用
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityUsage {
    pub class_id: String,
    pub capacity_minutes: f64,  // 产能上限
    pub used_minutes: f64,      // 已分配分钟数
    pub order_count: usize,     // 已分配订单数
    pub total_cost: f64,        // 已分配成本
}

impl CapacityUsage {
    pub fn empty(class: &WorkerClass) -> Self {
        Self {
            class_id: class.class_id.clone(),
            capacity_minutes: class.max_capacity_minutes,
            used_minutes: 0.0,
            order_count: 0,
            total_cost: 0.0,
        }
    }
}

// ==========================================
// Trait: CapacityConstraint
// ==========================================
// 用途: 求解后复核产能约束 + 汇总利用率
pub trait CapacityConstraint {
    /// 检查是否超限
    fn is_overflow(&self) -> bool;

    /// 产能利用率 (0.0 - 1.0+)
    fn utilization(&self) -> f64;
}

/// 浮点累加容差 (分钟)
pub const CAPACITY_EPSILON: f64 = 1e-6;

impl CapacityConstraint for CapacityUsage {
    fn is_overflow(&self) -> bool {
        self.used_minutes > self.capacity_minutes + CAPACITY_EPSILON
    }

    fn utilization(&self) -> f64 {
        if self.capacity_minutes <= 0.0 {
            return 0.0;
        }
        self.used_minutes / self.capacity_minutes
    }
}
