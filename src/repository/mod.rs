// ==========================================
// 履约中心人力分配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod assignment_repo;
pub mod drift_repo;
pub mod error;
pub mod order_repo;
pub mod violation_repo;

// 重导出核心仓储
pub use assignment_repo::AssignmentRepository;
pub use drift_repo::DriftRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::OrderRepository;
pub use violation_repo::ViolationRepository;
