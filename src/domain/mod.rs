// ==========================================
// 履约中心人力分配系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、约束接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod order;
pub mod quality;
pub mod types;
pub mod violation;
pub mod worker;

// 重导出核心类型
pub use assignment::{Assignment, AssignmentPlan};
pub use order::{Order, RawOrderRecord};
pub use quality::{DqLevel, DqReport, DqViolation};
pub use types::{Comparison, OrderAttribute, Severity};
pub use violation::{AuditReport, DriftStats, ViolationRecord};
pub use worker::{CapacityConstraint, CapacityUsage, WorkerClass, CAPACITY_EPSILON};
