// ==========================================
// SafetyAuditor 集成测试
// ==========================================
// 测试目标: 分配结果的安全审计
// 覆盖范围: 无漏报、无误报、声明式规则、优化器 → 审计衔接
// ==========================================


use fulfillment_optimizer::domain::{Assignment, Order, OrderAttribute, Severity, WorkerClass};
use fulfillment_optimizer::engine::{
    rule_names, AssignmentOptimizer, AuditError, RuleDefinition, RuleRegistry, SafetyAuditor,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use test_helpers::{create_test_order, robot_human_classes};

fn assign(order: &Order, class_id: &str) -> Assignment {
    Assignment {
        order_id: order.order_id.clone(),
        class_id: class_id.to_string(),
        processing_minutes: order.required_processing_minutes,
        cost: 0.0,
    }
}

// ==========================================
// 场景测试
// ==========================================

#[test]
fn test_heavy_robot_order_yields_single_weight_violation() {
    let classes = robot_human_classes();
    let orders = vec![create_test_order("1", 25.0, 3, 3.0)];
    let auditor = SafetyAuditor::new(RuleRegistry::from_worker_classes(&classes));

    let report = auditor.audit(&[assign(&orders[0], "Robot")], &orders).unwrap();

    assert_eq!(report.violations.len(), 1);
    let v = &report.violations[0];
    assert_eq!(v.order_id, "1");
    assert_eq!(v.rule_name, rule_names::WEIGHT_LIMIT);
    assert_eq!(v.observed_value, 25.0);
    assert_eq!(v.threshold, 5.0);
    assert_eq!(v.severity, Severity::Critical);
}

#[test]
fn test_weight_exactly_at_threshold_is_safe() {
    let classes = robot_human_classes();
    let orders = vec![create_test_order("1", 5.0, 3, 3.0)];
    let auditor = SafetyAuditor::new(RuleRegistry::from_worker_classes(&classes));

    let report = auditor.audit(&[assign(&orders[0], "Robot")], &orders).unwrap();
    assert!(!report.has_violations());
}

#[test]
fn test_optimizer_output_audited_end_to_end() {
    // 机器人更便宜,优化器会把重单派给机器人;审计负责发现
    let classes = vec![
        WorkerClass::new("Robot", 5.0, 480.0).with_max_safe_weight(5.0),
        WorkerClass::new("Human", 16.0, 600.0).with_max_item_count(40),
    ];
    let orders = vec![
        create_test_order("1", 2.0, 1, 1.0),
        create_test_order("2", 9.5, 4, 4.0),
        create_test_order("3", 25.0, 12, 12.0),
    ];

    let plan = AssignmentOptimizer::default().optimize(&orders, &classes).unwrap();
    assert!(plan.assignments.iter().all(|a| a.class_id == "Robot"));

    let report = SafetyAuditor::new(RuleRegistry::from_worker_classes(&classes))
        .audit(&plan.assignments, &orders)
        .unwrap();

    let flagged: Vec<&str> = report.violations.iter().map(|v| v.order_id.as_str()).collect();
    assert_eq!(flagged, vec!["2", "3"]);
    assert_eq!(report.audited_orders, 3);

    let robot_weight = report
        .drift
        .iter()
        .find(|s| s.class_id == "Robot" && s.attribute == OrderAttribute::WeightKg)
        .unwrap();
    assert_eq!(robot_weight.exceed_count, 2);
    assert!((robot_weight.max_excess - 20.0).abs() < 1e-9);
}

#[test]
fn test_declarative_rule_added_without_code_change() {
    let mut thresholds = BTreeMap::new();
    thresholds.insert("Human".to_string(), 30.0);
    let defs = vec![RuleDefinition {
        rule_name: "human_processing_limit".to_string(),
        attribute: "required_processing_minutes".to_string(),
        comparison: Default::default(),
        severity: Severity::Info,
        thresholds,
    }];
    let registry = RuleRegistry::from_definitions(&defs).unwrap();

    let orders = vec![
        create_test_order("1", 1.0, 45, 45.0),
        create_test_order("2", 1.0, 10, 10.0),
    ];
    let report = SafetyAuditor::new(registry)
        .audit(&[assign(&orders[0], "Human"), assign(&orders[1], "Human")], &orders)
        .unwrap();

    assert_eq!(report.rules_for_order("1"), vec!["human_processing_limit"]);
    assert!(report.rules_for_order("2").is_empty());
}

#[test]
fn test_rule_with_unknown_attribute_rejected() {
    let defs = vec![RuleDefinition {
        rule_name: "volume_limit".to_string(),
        attribute: "volume_m3".to_string(),
        comparison: Default::default(),
        severity: Severity::Warning,
        thresholds: BTreeMap::new(),
    }];
    let err = RuleRegistry::from_definitions(&defs).unwrap_err();
    assert!(matches!(err, AuditError::RuleConfigurationError { .. }));
}

#[test]
fn test_rule_definitions_parse_from_json() {
    let json = r#"[
        {"rule_name": "weight_limit", "attribute": "weight_kg", "severity": "CRITICAL",
         "thresholds": {"Robot": 5.0}}
    ]"#;
    let defs: Vec<RuleDefinition> = serde_json::from_str(json).unwrap();
    let registry = RuleRegistry::from_definitions(&defs).unwrap();
    assert!(registry.rules()[0].applies_to("Robot"));
    assert!(!registry.rules()[0].applies_to("Human"));
}

// ==========================================
// 性质测试: 无漏报 + 无误报
// ==========================================

fn arb_orders() -> impl Strategy<Value = Vec<(f64, u32, bool)>> {
    // (重量, 件数, 是否分配给机器人)
    prop::collection::vec((0u32..=3000, 1u32..=80, any::<bool>()), 1..=40).prop_map(|rows| {
        rows.into_iter()
            .map(|(w, items, robot)| (f64::from(w) / 100.0, items, robot))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn audit_flags_exactly_the_threshold_breaches(rows in arb_orders()) {
        let classes = vec![
            WorkerClass::new("Robot", 5.0, 480.0).with_max_safe_weight(5.0),
            WorkerClass::new("Human", 16.0, 600.0).with_max_item_count(40),
        ];
        let orders: Vec<Order> = rows
            .iter()
            .enumerate()
            .map(|(i, &(w, items, _))| create_test_order(&i.to_string(), w, items, f64::from(items)))
            .collect();
        let assignments: Vec<Assignment> = orders
            .iter()
            .zip(rows.iter())
            .map(|(o, &(_, _, robot))| assign(o, if robot { "Robot" } else { "Human" }))
            .collect();

        let report = SafetyAuditor::new(RuleRegistry::from_worker_classes(&classes))
            .audit(&assignments, &orders)
            .unwrap();

        let mut expected = BTreeSet::new();
        for (o, &(w, items, robot)) in orders.iter().zip(rows.iter()) {
            if robot && w > 5.0 {
                expected.insert((o.order_id.clone(), rule_names::WEIGHT_LIMIT.to_string()));
            }
            if !robot && items > 40 {
                expected.insert((o.order_id.clone(), rule_names::ITEM_COUNT_LIMIT.to_string()));
            }
        }

        let actual: Vec<(String, String)> = report
            .violations
            .iter()
            .map(|v| (v.order_id.clone(), v.rule_name.clone()))
            .collect();
        let actual_set: BTreeSet<(String, String)> = actual.iter().cloned().collect();

        // 每个 (订单, 规则) 恰好一条
        prop_assert_eq!(actual.len(), actual_set.len());
        prop_assert_eq!(actual_set, expected);
    }
}
