// ==========================================
// 履约中心人力分配系统 - 领域类型定义
// ==========================================
// 红线: 审计规则必须是声明式的,不允许内联分支
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 违规严重等级 (Severity)
// ==========================================
// 等级制: 只用于报表着色与排序,不参与优化
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,     // 提示
    Warning,  // 警告
    Critical, // 严重 (人身/设备安全)
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!("未知严重等级: {}", other)),
        }
    }
}

// ==========================================
// 订单属性 (Order Attribute)
// ==========================================
// 审计规则可引用的订单字段,名称与订单表列名一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAttribute {
    WeightKg,
    ItemCount,
    RequiredProcessingMinutes,
}

impl OrderAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAttribute::WeightKg => "weight_kg",
            OrderAttribute::ItemCount => "item_count",
            OrderAttribute::RequiredProcessingMinutes => "required_processing_minutes",
        }
    }
}

impl fmt::Display for OrderAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderAttribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weight_kg" | "total_weight_kg" => Ok(OrderAttribute::WeightKg),
            "item_count" | "num_items" => Ok(OrderAttribute::ItemCount),
            "required_processing_minutes" => Ok(OrderAttribute::RequiredProcessingMinutes),
            other => Err(format!("订单表不存在字段: {}", other)),
        }
    }
}

// ==========================================
// 比较方式 (Comparison)
// ==========================================
// 谓词语义: "观测值 <比较> 阈值" 成立即为违规
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan,    // 不得超过
    GreaterOrEqual, // 必须严格低于
    LessThan,       // 不得低于
}

impl Comparison {
    /// 判定观测值是否违规
    pub fn is_violated(&self, observed: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => observed > threshold,
            Comparison::GreaterOrEqual => observed >= threshold,
            Comparison::LessThan => observed < threshold,
        }
    }

    /// 违规幅度 (未违规时为 0)
    pub fn excess(&self, observed: f64, threshold: f64) -> f64 {
        match self {
            Comparison::GreaterThan | Comparison::GreaterOrEqual => (observed - threshold).max(0.0),
            Comparison::LessThan => (threshold - observed).max(0.0),
        }
    }
}

impl Default for Comparison {
    fn default() -> Self {
        Comparison::GreaterThan
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::GreaterThan => write!(f, ">"),
            Comparison::GreaterOrEqual => write!(f, ">="),
            Comparison::LessThan => write!(f, "<"),
        }
    }
}
