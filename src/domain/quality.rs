// ==========================================
// 履约中心人力分配系统 - 数据质量模型
// ==========================================
// 用途: 原始订单入库后的脏数据统计 (清洗前)
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// DqLevel - 数据质量级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DqLevel {
    Error,   // 错误（清洗时丢弃）
    Warning, // 警告（清洗时修复）
}

// ==========================================
// DqViolation - 单行数据质量问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DqViolation {
    pub order_id: i64,
    pub level: DqLevel,
    pub field: String,
    pub message: String,
}

// ==========================================
// DqReport - 数据质量报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqReport {
    pub total_rows: usize,           // 总行数
    pub missing_item_count: usize,   // 件数缺失 (传感器漏扫)
    pub negative_weight: usize,      // 负重量 (符号录入错误)
    pub violations: Vec<DqViolation>, // 违规明细
}

impl DqReport {
    /// 清洗后可用行数 (缺失件数的行被丢弃)
    pub fn usable_rows(&self) -> usize {
        self.total_rows.saturating_sub(self.missing_item_count)
    }

    pub fn is_clean(&self) -> bool {
        self.missing_item_count == 0 && self.negative_weight == 0
    }
}
