// ==========================================
// 履约中心人力分配系统 - BI 导出
// ==========================================
// 产物 (导出目录下):
// - bi_master.csv         订单级主表 (含安全标记)
// - violations.csv        违规明细
// - drift_stats.csv       工种分布漂移
// - executive_summary.json 管理层汇总
// ==========================================

use crate::domain::assignment::AssignmentPlan;
use crate::domain::order::Order;
use crate::domain::violation::AuditReport;
use crate::report::error::{ReportError, ReportResult};
use crate::report::summary::ExecutiveSummary;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MASTER_FILE: &str = "bi_master.csv";
pub const VIOLATIONS_FILE: &str = "violations.csv";
pub const DRIFT_FILE: &str = "drift_stats.csv";
pub const SUMMARY_FILE: &str = "executive_summary.json";

pub const FLAG_VIOLATION: &str = "Violation";
pub const FLAG_SAFE: &str = "Safe";

/// 主表行
#[derive(Debug, Serialize)]
struct MasterRow<'a> {
    order_id: &'a str,
    class_id: &'a str,
    cost: f64,
    processing_minutes: f64,
    item_count: u32,
    weight_kg: f64,
    is_safety_violation: &'static str,
    violated_rules: String, // 分号分隔
}

/// 导出结果
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub master: PathBuf,
    pub violations: PathBuf,
    pub drift: PathBuf,
    pub summary: PathBuf,
    pub master_rows: usize,
}

pub struct BiExporter {
    export_dir: PathBuf,
}

impl BiExporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// 写出全部 BI 产物
    ///
    /// # 返回
    /// - Err(UnknownOrder): 方案引用了订单列表中不存在的订单
    pub fn export(
        &self,
        plan: &AssignmentPlan,
        orders: &[Order],
        audit: &AuditReport,
    ) -> ReportResult<ExportPaths> {
        fs::create_dir_all(&self.export_dir)?;

        let paths = ExportPaths {
            master: self.export_dir.join(MASTER_FILE),
            violations: self.export_dir.join(VIOLATIONS_FILE),
            drift: self.export_dir.join(DRIFT_FILE),
            summary: self.export_dir.join(SUMMARY_FILE),
            master_rows: plan.assignments.len(),
        };

        self.write_master(&paths.master, plan, orders, audit)?;
        write_serialized(&paths.violations, &audit.violations)?;
        write_serialized(&paths.drift, &audit.drift)?;

        let summary = ExecutiveSummary::build(plan, audit);
        fs::write(&paths.summary, serde_json::to_string_pretty(&summary)?)?;

        info!(
            export_dir = %self.export_dir.display(),
            master_rows = paths.master_rows,
            violations = audit.violations.len(),
            "BI 导出完成"
        );
        Ok(paths)
    }

    fn write_master(
        &self,
        path: &Path,
        plan: &AssignmentPlan,
        orders: &[Order],
        audit: &AuditReport,
    ) -> ReportResult<()> {
        let orders_by_id: HashMap<&str, &Order> =
            orders.iter().map(|o| (o.order_id.as_str(), o)).collect();

        let mut rules_by_order: HashMap<&str, Vec<&str>> = HashMap::new();
        for v in &audit.violations {
            rules_by_order
                .entry(v.order_id.as_str())
                .or_default()
                .push(v.rule_name.as_str());
        }

        let mut writer = csv::Writer::from_path(path)?;
        for a in &plan.assignments {
            let order = orders_by_id
                .get(a.order_id.as_str())
                .ok_or_else(|| ReportError::UnknownOrder(a.order_id.clone()))?;
            let rules = rules_by_order.get(a.order_id.as_str());

            writer.serialize(MasterRow {
                order_id: &a.order_id,
                class_id: &a.class_id,
                cost: a.cost,
                processing_minutes: a.processing_minutes,
                item_count: order.item_count,
                weight_kg: order.weight_kg,
                is_safety_violation: if rules.is_some() { FLAG_VIOLATION } else { FLAG_SAFE },
                violated_rules: rules.map(|r| r.join(";")).unwrap_or_default(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// 以 serde 表头写出记录列表 (空列表只写出空文件)
fn write_serialized<T: Serialize>(path: &Path, rows: &[T]) -> ReportResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
