// ==========================================
// 履约中心人力分配系统 - 订单领域模型
// ==========================================
// 生命周期: 上游生成 → 清洗视图 → 优化器只读 → 审计只读
// ==========================================

use crate::domain::types::OrderAttribute;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 清洗后订单
// ==========================================
// 红线: 优化前未分配,优化后恰好分配给一个工种
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,                       // 订单号 (唯一)
    pub weight_kg: f64,                         // 总重量 (kg, >= 0)
    pub item_count: u32,                        // 件数 (>= 1)
    pub arrival_timestamp: Option<DateTime<Utc>>, // 到达时间
    pub required_processing_minutes: f64,       // 所需处理时长 (分钟, 派生, > 0)
}

impl Order {
    /// 读取审计规则引用的属性值
    pub fn attribute_value(&self, attribute: OrderAttribute) -> f64 {
        match attribute {
            OrderAttribute::WeightKg => self.weight_kg,
            OrderAttribute::ItemCount => self.item_count as f64,
            OrderAttribute::RequiredProcessingMinutes => self.required_processing_minutes,
        }
    }
}

// ==========================================
// RawOrderRecord - 原始订单行 (清洗前)
// ==========================================
// 允许缺失件数与负重量,由 clean_orders 视图修复
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrderRecord {
    pub row_number: usize,                      // 源文件行号 (含表头, 从 2 开始)
    pub order_id: i64,
    pub num_items: Option<u32>,
    pub total_weight_kg: f64,
    #[serde(default)]
    pub arrival_timestamp: Option<DateTime<Utc>>,
}
