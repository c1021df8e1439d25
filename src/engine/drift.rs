// ==========================================
// 履约中心人力分配系统 - 分布漂移统计
// ==========================================
// 职责: 按工种汇总已分配订单属性分布,刻画相对安全阈值的偏离
// 输出: DriftStats (供报表层展示,不做通过/失败判定)
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::order::Order;
use crate::domain::types::{Comparison, OrderAttribute};
use crate::domain::violation::DriftStats;
use crate::engine::rules::RuleRegistry;
use std::collections::HashMap;

// ==========================================
// DriftAnalyzer - 漂移统计
// ==========================================
pub struct DriftAnalyzer {
    // 无状态
}

impl DriftAnalyzer {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算各工种的分布统计
    ///
    /// 属性范围: 注册表引用的全部属性 + weight_kg (始终统计)
    /// 阈值: 取该工种首条引用此属性的规则阈值
    pub fn analyze(
        &self,
        assignments: &[Assignment],
        orders_by_id: &HashMap<&str, &Order>,
        registry: &RuleRegistry,
    ) -> Vec<DriftStats> {
        let mut attributes = registry.audited_attributes();
        if !attributes.contains(&OrderAttribute::WeightKg) {
            attributes.insert(0, OrderAttribute::WeightKg);
        }

        // 工种按首次出现顺序分组
        let mut class_order: Vec<&str> = Vec::new();
        let mut grouped: HashMap<&str, Vec<&Order>> = HashMap::new();
        for a in assignments {
            let Some(order) = orders_by_id.get(a.order_id.as_str()) else {
                continue;
            };
            let bucket = grouped.entry(a.class_id.as_str()).or_insert_with(|| {
                class_order.push(a.class_id.as_str());
                Vec::new()
            });
            bucket.push(*order);
        }

        let mut stats = Vec::new();
        for class_id in class_order {
            let assigned = &grouped[class_id];

            for attribute in attributes.iter() {
                let values: Vec<f64> = assigned.iter().map(|o| o.attribute_value(*attribute)).collect();
                let rule = registry
                    .rules()
                    .iter()
                    .find(|r| r.attribute == *attribute && r.applies_to(class_id));
                let threshold = rule.and_then(|r| r.threshold_for(class_id));
                let comparison = rule.map(|r| r.comparison).unwrap_or_default();

                stats.push(describe(class_id, *attribute, &values, threshold, comparison));
            }
        }
        stats
    }
}

impl Default for DriftAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 统计工具
// ==========================================

/// 分位数 (线性插值, 位置 = p·(n-1))
///
/// `sorted` 必须升序且非空
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// 计算单组样本的描述统计 (`values` 非空)
fn describe(
    class_id: &str,
    attribute: OrderAttribute,
    values: &[f64],
    threshold: Option<f64>,
    comparison: Comparison,
) -> DriftStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;

    let (exceed_count, max_excess) = match threshold {
        Some(t) => sorted.iter().fold((0usize, 0.0_f64), |(count, max_excess), &v| {
            if comparison.is_violated(v, t) {
                (count + 1, max_excess.max(comparison.excess(v, t)))
            } else {
                (count, max_excess)
            }
        }),
        None => (0, 0.0),
    };

    DriftStats {
        class_id: class_id.to_string(),
        attribute,
        sample_count: n,
        mean,
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[n - 1],
        threshold,
        exceed_count,
        exceed_ratio: exceed_count as f64 / n as f64,
        max_excess,
    }
}
