// ==========================================
// 履约中心人力分配系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 配置错误 (致命) / 不可行与求解错误 (致命, 调整输入后可重试)
// 说明: 审计违规不是错误,不在此定义
// ==========================================

use thiserror::Error;

/// 优化器错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    // ===== 配置错误 =====
    #[error("配置错误: {0}")]
    ConfigurationError(String),

    // ===== 不可行 =====
    #[error("无可行分配: 订单总需求 {demand_minutes:.2} 分钟, 工种总产能 {capacity_minutes:.2} 分钟 ({message})")]
    InfeasibilityError {
        demand_minutes: f64,
        capacity_minutes: f64,
        message: String,
    },

    // ===== 求解器错误 =====
    #[error("求解超时: 超过时间预算 {limit_ms} ms")]
    SolverTimeoutError { limit_ms: u64 },

    #[error("求解器错误: {0}")]
    SolverError(String),
}

impl OptimizerError {
    /// 是否允许调用方调整输入后重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OptimizerError::InfeasibilityError { .. } | OptimizerError::SolverTimeoutError { .. }
        )
    }
}

/// 审计器错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    #[error("规则配置错误 (rule={rule_name}): {message}")]
    RuleConfigurationError { rule_name: String, message: String },

    #[error("分配引用了不存在的订单: {0}")]
    UnknownOrder(String),
}

/// Result 类型别名
pub type OptimizerResult<T> = Result<T, OptimizerError>;
pub type AuditResult<T> = Result<T, AuditError>;
