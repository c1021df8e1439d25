// ==========================================
// 履约中心人力分配系统 - 报表层
// ==========================================
// 职责: 管理层汇总 + BI 平面表导出
// 红线: 只读分配方案与审计报告,不回写
// ==========================================

pub mod bi_export;
pub mod error;
pub mod summary;

pub use bi_export::{BiExporter, ExportPaths};
pub use error::{ReportError, ReportResult};
pub use summary::{ClassSummary, ExecutiveSummary};
