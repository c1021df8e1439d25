// ==========================================
// 履约中心人力分配系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + good_lp (MIP)
// 系统定位: 成本最优分配 + 安全审计 (审计只报告,不修改分配)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 优化器与审计
pub mod engine;

// 导入层 - 原始订单
pub mod importer;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/清洗视图）
pub mod db;

// 模拟数据
pub mod generator;

// 报表层 - 汇总与 BI 导出
pub mod report;

// 流水线编排
pub mod pipeline;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Comparison, OrderAttribute, Severity};

// 领域实体
pub use domain::{
    Assignment, AssignmentPlan, AuditReport, DriftStats, Order, ViolationRecord, WorkerClass,
};

// 引擎
pub use engine::{
    AssignmentOptimizer, AuditError, OptimizerConfig, OptimizerError, RuleDefinition,
    RuleRegistry, SafetyAuditor,
};

// 编排
pub use pipeline::{FulfillmentPipeline, PipelineOutcome, PipelinePaths};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "履约中心人力分配系统";
