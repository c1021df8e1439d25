// ==========================================
// 履约中心人力分配系统 - 分配结果模型
// ==========================================
// 由优化器独占产生,产生后对审计只读
// ==========================================

use crate::domain::worker::CapacityUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Assignment - 单订单分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub order_id: String,
    pub class_id: String,
    pub processing_minutes: f64, // 占用产能 (分钟)
    pub cost: f64,               // 分配成本
}

// ==========================================
// AssignmentPlan - 一次求解的完整分配方案
// ==========================================
// 说明: 存在等价最优解时,具体分配由求解器决定,不保证跨运行一致;
//       只有 total_cost (目标函数值) 保证稳定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub run_id: String,
    pub assignments: Vec<Assignment>,  // 与输入订单同序
    pub total_cost: f64,               // 目标函数值
    pub class_usage: Vec<CapacityUsage>, // 与输入工种同序
    pub solve_duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl AssignmentPlan {
    /// 指定工种的分配列表
    pub fn assignments_for<'a>(&'a self, class_id: &'a str) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments.iter().filter(move |a| a.class_id == class_id)
    }

    pub fn usage_for(&self, class_id: &str) -> Option<&CapacityUsage> {
        self.class_usage.iter().find(|u| u.class_id == class_id)
    }
}
