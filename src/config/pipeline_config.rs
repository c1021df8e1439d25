// ==========================================
// 履约中心人力分配系统 - 运行参数
// ==========================================
// 一次流水线运行所需的全部参数快照
// 来源: ConfigManager (config_kv) 或直接构造 (测试)
// ==========================================

use crate::domain::worker::WorkerClass;
use crate::engine::error::AuditResult;
use crate::engine::optimizer::OptimizerConfig;
use crate::engine::rules::{RuleDefinition, RuleRegistry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// GeneratorConfig - 模拟订单生成参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub order_count: usize,         // 订单数
    pub mean_items: f64,            // 件数 Poisson 均值
    pub weight_mean_per_item: f64,  // 单件重量均值 (kg)
    pub weight_std_per_item: f64,   // 单件重量标准差 (kg)
    pub min_weight_per_item: f64,   // 单件重量下限 (kg)
    pub corruption_rate: f64,       // 脏数据注入比例 (每类)
    pub seed: u64,                  // 随机种子
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            order_count: 1000,
            mean_items: 3.0,
            weight_mean_per_item: 2.0,
            weight_std_per_item: 0.5,
            min_weight_per_item: 0.1,
            corruption_rate: 0.05,
            seed: 42,
        }
    }
}

// ==========================================
// PipelineConfig - 流水线运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub worker_classes: Vec<WorkerClass>,
    pub safety_rules: Option<Vec<RuleDefinition>>,
    pub solver_time_limit_secs: u64,
    pub minutes_per_item: f64,
    pub generator: GeneratorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_classes: WorkerClass::default_classes(),
            safety_rules: None,
            solver_time_limit_secs: 60,
            minutes_per_item: 1.0,
            generator: GeneratorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// 求解配置 (0 秒 = 不限时)
    pub fn optimizer_config(&self) -> OptimizerConfig {
        match self.solver_time_limit_secs {
            0 => OptimizerConfig::default(),
            secs => OptimizerConfig::with_time_limit(Duration::from_secs(secs)),
        }
    }

    /// 构建规则注册表
    ///
    /// 显式声明的规则优先;否则由工种阈值派生
    pub fn rule_registry(&self) -> AuditResult<RuleRegistry> {
        match &self.safety_rules {
            Some(defs) => RuleRegistry::from_definitions(defs),
            None => Ok(RuleRegistry::from_worker_classes(&self.worker_classes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_zero_time_limit_means_unbounded() {
        let config = PipelineConfig {
            solver_time_limit_secs: 0,
            ..Default::default()
        };
        assert!(config.optimizer_config().time_limit.is_none());

        let config = PipelineConfig::default();
        assert_eq!(config.optimizer_config().time_limit, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_explicit_rules_take_precedence() {
        let mut thresholds = BTreeMap::new();
        thresholds.insert("Human".to_string(), 20.0);
        let config = PipelineConfig {
            safety_rules: Some(vec![RuleDefinition {
                rule_name: "human_lift_limit".to_string(),
                attribute: "weight_kg".to_string(),
                comparison: Default::default(),
                severity: crate::domain::types::Severity::Warning,
                thresholds,
            }]),
            ..Default::default()
        };

        let registry = config.rule_registry().unwrap();
        assert_eq!(registry.rules().len(), 1);
        assert!(registry.rules()[0].applies_to("Human"));
        assert!(!registry.rules()[0].applies_to("Robot"));
    }
}
