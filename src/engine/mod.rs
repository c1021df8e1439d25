// ==========================================
// 履约中心人力分配系统 - 引擎层
// ==========================================
// 职责: 成本最优分配 (MIP) + 安全审计 (规则注册表 + 漂移统计)
// 红线: 优化器不依赖审计;审计只依赖分配表结构
// 红线: Engine 不拼 SQL
// ==========================================

pub mod audit;
pub mod drift;
pub mod error;
pub mod optimizer;
pub mod rules;

// 重导出核心引擎
pub use audit::SafetyAuditor;
pub use drift::DriftAnalyzer;
pub use error::{AuditError, AuditResult, OptimizerError, OptimizerResult};
pub use optimizer::{AssignmentOptimizer, OptimizerConfig};
pub use rules::{rule_names, RuleDefinition, RuleRegistry, SafetyRule};
