// ==========================================
// 履约中心人力分配系统 - 数据质量分析
// ==========================================
// 职责: 统计原始订单表中的脏数据 (清洗前)
// - 件数缺失 → Error (清洗时丢弃)
// - 负重量   → Warning (清洗时取绝对值)
// ==========================================

use crate::domain::quality::{DqLevel, DqReport, DqViolation};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::columns;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub struct DqAnalyzer {
    conn: Arc<Mutex<Connection>>,
}

impl DqAnalyzer {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> ImportResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))
    }

    /// 生成 DQ 报告
    ///
    /// # 返回
    /// - Err(OrdersTableMissing): 尚未导入原始订单
    pub fn analyze(&self) -> ImportResult<DqReport> {
        let conn = self.get_conn()?;

        let total_rows: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, num_items IS NULL, total_weight_kg
            FROM orders
            WHERE num_items IS NULL OR total_weight_kg < 0
            ORDER BY order_id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut report = DqReport {
            total_rows: total_rows as usize,
            missing_item_count: 0,
            negative_weight: 0,
            violations: Vec::new(),
        };

        for row in rows {
            let (order_id, items_missing, weight) = row?;
            if items_missing {
                report.missing_item_count += 1;
                report.violations.push(DqViolation {
                    order_id,
                    level: DqLevel::Error,
                    field: columns::NUM_ITEMS.to_string(),
                    message: "件数缺失 (传感器漏扫)".to_string(),
                });
            }
            if weight < 0.0 {
                report.negative_weight += 1;
                report.violations.push(DqViolation {
                    order_id,
                    level: DqLevel::Warning,
                    field: columns::TOTAL_WEIGHT_KG.to_string(),
                    message: format!("负重量 {} (符号录入错误)", weight),
                });
            }
        }

        info!(
            total_rows = report.total_rows,
            missing_item_count = report.missing_item_count,
            negative_weight = report.negative_weight,
            "数据质量分析完成"
        );
        if !report.is_clean() {
            warn!(usable_rows = report.usable_rows(), "原始订单存在脏数据,将由 clean_orders 视图处理");
        }

        Ok(report)
    }
}
