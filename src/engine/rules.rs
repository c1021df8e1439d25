// ==========================================
// 履约中心人力分配系统 - 安全规则注册表
// ==========================================
// 红线: 规则是声明式谓词对象,新增规则只需注册,不改审计流程
// ==========================================
// 规则形态: 对工种 C, 已分配订单的属性 A 与阈值 T 比较, 成立即违规
// 适用性: 仅当工种声明了该规则的阈值时规则生效 (例: 人工免于承重规则)
// ==========================================

use crate::domain::order::Order;
use crate::domain::types::{Comparison, OrderAttribute, Severity};
use crate::domain::violation::ViolationRecord;
use crate::domain::worker::WorkerClass;
use crate::engine::error::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 标准规则名
pub mod rule_names {
    pub const WEIGHT_LIMIT: &str = "weight_limit";
    pub const ITEM_COUNT_LIMIT: &str = "item_count_limit";
}

// ==========================================
// RuleDefinition - 规则声明 (配置/JSON 形态)
// ==========================================
// 属性名为字符串,校验后转换为 SafetyRule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub rule_name: String,
    pub attribute: String,
    #[serde(default)]
    pub comparison: Comparison,
    pub severity: Severity,
    pub thresholds: BTreeMap<String, f64>, // class_id → 阈值
}

// ==========================================
// SafetyRule - 已校验规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyRule {
    pub rule_name: String,
    pub attribute: OrderAttribute,
    pub comparison: Comparison,
    pub severity: Severity,
    pub thresholds: BTreeMap<String, f64>,
}

impl SafetyRule {
    /// 校验规则声明
    ///
    /// # 返回
    /// - Err(RuleConfigurationError): 规则名为空 / 属性不在订单表中 / 阈值非有限数
    pub fn from_definition(def: &RuleDefinition) -> AuditResult<Self> {
        let rule_name = def.rule_name.trim();
        if rule_name.is_empty() {
            return Err(AuditError::RuleConfigurationError {
                rule_name: def.rule_name.clone(),
                message: "规则名不能为空".to_string(),
            });
        }

        let attribute = def.attribute.parse::<OrderAttribute>().map_err(|message| {
            AuditError::RuleConfigurationError {
                rule_name: rule_name.to_string(),
                message,
            }
        })?;

        if let Some((class_id, value)) = def.thresholds.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AuditError::RuleConfigurationError {
                rule_name: rule_name.to_string(),
                message: format!("工种 {} 阈值非法: {}", class_id, value),
            });
        }

        Ok(Self {
            rule_name: rule_name.to_string(),
            attribute,
            comparison: def.comparison,
            severity: def.severity,
            thresholds: def.thresholds.clone(),
        })
    }

    /// 该规则对工种的阈值 (None = 不适用)
    pub fn threshold_for(&self, class_id: &str) -> Option<f64> {
        self.thresholds.get(class_id).copied()
    }

    pub fn applies_to(&self, class_id: &str) -> bool {
        self.thresholds.contains_key(class_id)
    }

    /// 评估单个 (订单, 工种) 对
    ///
    /// # 返回
    /// - Some(ViolationRecord): 违规
    /// - None: 未违规或规则不适用
    pub fn evaluate(&self, order: &Order, class_id: &str) -> Option<ViolationRecord> {
        let threshold = self.threshold_for(class_id)?;
        let observed = order.attribute_value(self.attribute);

        if !self.comparison.is_violated(observed, threshold) {
            return None;
        }

        Some(ViolationRecord {
            order_id: order.order_id.clone(),
            class_id: class_id.to_string(),
            rule_name: self.rule_name.clone(),
            observed_value: observed,
            threshold,
            severity: self.severity,
        })
    }
}

// ==========================================
// RuleRegistry - 规则注册表
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleRegistry {
    rules: Vec<SafetyRule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 注册规则 (规则名不可重复)
    pub fn register(&mut self, rule: SafetyRule) -> AuditResult<()> {
        if self.rules.iter().any(|r| r.rule_name == rule.rule_name) {
            return Err(AuditError::RuleConfigurationError {
                rule_name: rule.rule_name,
                message: "规则名重复".to_string(),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// 从规则声明批量构建
    pub fn from_definitions(defs: &[RuleDefinition]) -> AuditResult<Self> {
        let mut registry = Self::new();
        for def in defs {
            registry.register(SafetyRule::from_definition(def)?)?;
        }
        Ok(registry)
    }

    /// 由工种审计阈值派生标准规则
    ///
    /// - weight_limit: weight_kg > max_safe_weight_kg (CRITICAL)
    /// - item_count_limit: item_count > max_item_count (WARNING)
    pub fn from_worker_classes(classes: &[WorkerClass]) -> Self {
        let weight_thresholds: BTreeMap<String, f64> = classes
            .iter()
            .filter_map(|c| c.max_safe_weight_kg.map(|t| (c.class_id.clone(), t)))
            .collect();
        let item_thresholds: BTreeMap<String, f64> = classes
            .iter()
            .filter_map(|c| c.max_item_count.map(|t| (c.class_id.clone(), t as f64)))
            .collect();

        let mut rules = Vec::new();
        if !weight_thresholds.is_empty() {
            rules.push(SafetyRule {
                rule_name: rule_names::WEIGHT_LIMIT.to_string(),
                attribute: OrderAttribute::WeightKg,
                comparison: Comparison::GreaterThan,
                severity: Severity::Critical,
                thresholds: weight_thresholds,
            });
        }
        if !item_thresholds.is_empty() {
            rules.push(SafetyRule {
                rule_name: rule_names::ITEM_COUNT_LIMIT.to_string(),
                attribute: OrderAttribute::ItemCount,
                comparison: Comparison::GreaterThan,
                severity: Severity::Warning,
                thresholds: item_thresholds,
            });
        }

        Self { rules }
    }

    pub fn rules(&self) -> &[SafetyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 适用于工种的规则
    pub fn applicable_to<'a>(&'a self, class_id: &'a str) -> impl Iterator<Item = &'a SafetyRule> + 'a {
        self.rules.iter().filter(move |r| r.applies_to(class_id))
    }

    /// 规则引用到的属性 (去重, 保持注册顺序)
    pub fn audited_attributes(&self) -> Vec<OrderAttribute> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .map(|r| r.attribute)
            .filter(|a| seen.insert(*a))
            .collect()
    }
}
