// ==========================================
// AssignmentOptimizer 集成测试
// ==========================================
// 测试目标: 成本最优分配
// 覆盖范围: 完整性、产能约束、最优性、幂等、成本单调
// ==========================================


use fulfillment_optimizer::domain::{AssignmentPlan, Order, WorkerClass, CAPACITY_EPSILON};
use fulfillment_optimizer::engine::{AssignmentOptimizer, OptimizerConfig, OptimizerError};
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use test_helpers::{create_test_order, create_timed_orders, robot_human_classes};

// ==========================================
// 校验辅助
// ==========================================

/// 完整性: 每个订单恰好出现一次
fn assert_complete(plan: &AssignmentPlan, orders: &[Order]) {
    assert_eq!(plan.assignments.len(), orders.len());
    let assigned: HashSet<&str> = plan.assignments.iter().map(|a| a.order_id.as_str()).collect();
    for order in orders {
        assert!(assigned.contains(order.order_id.as_str()), "订单 {} 未分配", order.order_id);
    }
}

/// 产能: 逐工种全量求和
fn assert_within_capacity(plan: &AssignmentPlan, orders: &[Order], classes: &[WorkerClass]) {
    for class in classes {
        let used: f64 = plan
            .assignments
            .iter()
            .filter(|a| a.class_id == class.class_id)
            .map(|a| {
                orders
                    .iter()
                    .find(|o| o.order_id == a.order_id)
                    .map(|o| o.required_processing_minutes)
                    .unwrap()
            })
            .sum();
        assert!(
            used <= class.max_capacity_minutes + CAPACITY_EPSILON,
            "工种 {} 已用 {} 超过产能 {}",
            class.class_id,
            used,
            class.max_capacity_minutes
        );
    }
}

/// 穷举最优成本 (仅用于小规模订单)
fn brute_force_cost(orders: &[Order], classes: &[WorkerClass]) -> Option<f64> {
    let n = orders.len();
    let k = classes.len();
    let mut best: Option<f64> = None;
    let mut choice = vec![0usize; n];

    loop {
        let mut used = vec![0.0; k];
        let mut cost = 0.0;
        for (o, &c) in orders.iter().zip(choice.iter()) {
            used[c] += o.required_processing_minutes;
            cost += classes[c].cost_for(o.required_processing_minutes);
        }
        let feasible = used
            .iter()
            .zip(classes.iter())
            .all(|(&u, c)| u <= c.max_capacity_minutes + CAPACITY_EPSILON);
        if feasible && best.map_or(true, |b| cost < b) {
            best = Some(cost);
        }

        // 下一组合 (k 进制计数)
        let mut pos = 0;
        loop {
            if pos == n {
                return best;
            }
            choice[pos] += 1;
            if choice[pos] < k {
                break;
            }
            choice[pos] = 0;
            pos += 1;
        }
    }
}

// ==========================================
// 场景测试
// ==========================================

#[test]
fn test_robot_filled_to_capacity_then_human() {
    let orders = create_timed_orders(&[60.0, 60.0, 60.0]);
    let classes = robot_human_classes();

    let plan = AssignmentOptimizer::default().optimize(&orders, &classes).unwrap();

    assert!((plan.total_cost - 40.0).abs() < 1e-6);
    assert_eq!(plan.assignments_for("Robot").count(), 2);
    assert_eq!(plan.assignments_for("Human").count(), 1);

    let robot = plan.usage_for("Robot").unwrap();
    assert!((robot.used_minutes - 120.0).abs() < 1e-6);
    assert_complete(&plan, &orders);
    assert_within_capacity(&plan, &orders, &classes);
}

#[test]
fn test_assignment_costs_sum_to_objective() {
    let orders = create_timed_orders(&[15.0, 45.0, 30.0, 90.0, 20.0]);
    let classes = robot_human_classes();

    let plan = AssignmentOptimizer::default().optimize(&orders, &classes).unwrap();

    let sum: f64 = plan.assignments.iter().map(|a| a.cost).sum();
    assert!((sum - plan.total_cost).abs() < 1e-9);
    for a in &plan.assignments {
        let class = classes.iter().find(|c| c.class_id == a.class_id).unwrap();
        assert!((a.cost - class.cost_for(a.processing_minutes)).abs() < 1e-9);
    }
}

#[test]
fn test_plan_follows_input_order() {
    let orders = create_timed_orders(&[10.0, 20.0, 30.0]);
    let plan = AssignmentOptimizer::default()
        .optimize(&orders, &robot_human_classes())
        .unwrap();

    let ids: Vec<&str> = plan.assignments.iter().map(|a| a.order_id.as_str()).collect();
    assert_eq!(ids, vec!["O001", "O002", "O003"]);
}

#[test]
fn test_demand_exceeding_total_capacity_is_infeasible() {
    let orders = create_timed_orders(&[100.0, 100.0, 100.0, 100.0]);

    let err = AssignmentOptimizer::default()
        .optimize(&orders, &robot_human_classes())
        .unwrap_err();
    assert!(err.is_retryable());

    match err {
        OptimizerError::InfeasibilityError {
            demand_minutes,
            capacity_minutes,
            ..
        } => {
            assert_eq!(demand_minutes, 400.0);
            assert_eq!(capacity_minutes, 300.0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bin_packing_infeasibility_detected_by_solver() {
    // 总量 200 ≤ 200,但 70+70+60 无法装入两个 100 分钟工种
    let orders = create_timed_orders(&[70.0, 70.0, 60.0]);
    let classes = vec![
        WorkerClass::new("Robot", 5.0, 100.0),
        WorkerClass::new("Human", 16.0, 100.0),
    ];

    let err = AssignmentOptimizer::default().optimize(&orders, &classes).unwrap_err();
    assert!(matches!(err, OptimizerError::InfeasibilityError { .. }));
}

#[test]
fn test_missing_classes_is_configuration_error() {
    let orders = create_timed_orders(&[10.0]);
    let err = AssignmentOptimizer::default().optimize(&orders, &[]).unwrap_err();
    assert!(matches!(err, OptimizerError::ConfigurationError(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_non_positive_cost_is_configuration_error() {
    let orders = create_timed_orders(&[10.0]);
    let classes = vec![WorkerClass::new("Robot", 0.0, 100.0)];
    let err = AssignmentOptimizer::default().optimize(&orders, &classes).unwrap_err();
    assert!(matches!(err, OptimizerError::ConfigurationError(_)));
}

#[test]
fn test_safety_thresholds_do_not_constrain_assignment() {
    // 重单仍可分配给机器人 (安全阈值只由审计检查)
    let orders = vec![create_test_order("HEAVY", 25.0, 3, 30.0)];
    let plan = AssignmentOptimizer::default()
        .optimize(&orders, &robot_human_classes())
        .unwrap();
    assert_eq!(plan.assignments[0].class_id, "Robot");
}

#[test]
fn test_generous_time_limit_matches_unbounded() {
    let orders = create_timed_orders(&[25.0, 35.0, 45.0, 55.0, 65.0]);
    let classes = robot_human_classes();

    let unbounded = AssignmentOptimizer::default().optimize(&orders, &classes).unwrap();
    let bounded = AssignmentOptimizer::new(OptimizerConfig::with_time_limit(Duration::from_secs(30)))
        .optimize(&orders, &classes)
        .unwrap();

    assert!((unbounded.total_cost - bounded.total_cost).abs() < 1e-6);
}

#[test]
fn test_tight_time_limit_aborts_hard_instance() {
    // 950 单, 分钟数为 0.37 的倍数: Robot 产能成为难解的背包
    let minutes: Vec<f64> = (0..950).map(|i| 0.37 * f64::from(i % 40 + 1)).collect();
    let orders = create_timed_orders(&minutes);
    let classes = vec![
        WorkerClass::new("Robot", 5.0, 480.0),
        WorkerClass::new("Human", 16.0, 599940.0),
    ];
    let limit = Duration::from_millis(200);
    let optimizer = AssignmentOptimizer::new(OptimizerConfig::with_time_limit(limit));

    let started = Instant::now();
    let err = optimizer.optimize(&orders, &classes).unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, OptimizerError::SolverTimeoutError { limit_ms: 200 }));
    assert!(err.is_retryable());
    // 求解在预算附近中止,不在后台继续运行
    assert!(elapsed < limit + Duration::from_secs(5), "耗时 {:?}", elapsed);
}

#[test]
fn test_repeated_runs_yield_same_objective() {
    let orders = create_timed_orders(&[30.0, 30.0, 30.0, 30.0, 30.0, 30.0]);
    let classes = robot_human_classes();
    let optimizer = AssignmentOptimizer::default();

    let first = optimizer.optimize(&orders, &classes).unwrap();
    for _ in 0..3 {
        let again = optimizer.optimize(&orders, &classes).unwrap();
        assert!((again.total_cost - first.total_cost).abs() < 1e-6);
        assert_ne!(again.run_id, first.run_id);
    }
}

// ==========================================
// 性质测试
// ==========================================

fn arb_minutes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1u32..=60).prop_map(f64::from), 1..=7)
}

/// Robot 产能随机, Human 产能始终足以兜底
fn classes_for(minutes: &[f64], robot_cost: f64, robot_capacity: f64) -> Vec<WorkerClass> {
    let demand: f64 = minutes.iter().sum();
    vec![
        WorkerClass::new("Robot", robot_cost, robot_capacity),
        WorkerClass::new("Human", 16.0, demand + 1.0),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// 可行输入下: 全部订单被分配且不超产能,成本等于穷举最优
    #[test]
    fn optimizer_is_complete_feasible_and_optimal(
        minutes in arb_minutes(),
        robot_capacity in 1u32..=200,
    ) {
        let orders = create_timed_orders(&minutes);
        let classes = classes_for(&minutes, 5.0, f64::from(robot_capacity));

        let plan = AssignmentOptimizer::default().optimize(&orders, &classes).unwrap();

        assert_complete(&plan, &orders);
        assert_within_capacity(&plan, &orders, &classes);

        let best = brute_force_cost(&orders, &classes).unwrap();
        prop_assert!((plan.total_cost - best).abs() < 1e-6,
            "solver cost {} vs brute force {}", plan.total_cost, best);
    }

    /// 提高某工种单价不会降低最优总成本,也不会增加该工种承担的分钟数
    #[test]
    fn raising_cost_never_lowers_total(
        minutes in arb_minutes(),
        robot_capacity in 1u32..=200,
        bump in 1u32..=20,
    ) {
        let orders = create_timed_orders(&minutes);
        let cheap = classes_for(&minutes, 5.0, f64::from(robot_capacity));
        let pricier = classes_for(&minutes, 5.0 + f64::from(bump), f64::from(robot_capacity));

        let optimizer = AssignmentOptimizer::default();
        let before = optimizer.optimize(&orders, &cheap).unwrap();
        let after = optimizer.optimize(&orders, &pricier).unwrap();

        prop_assert!(after.total_cost >= before.total_cost - 1e-6);

        let robot_before = before.usage_for("Robot").unwrap().used_minutes;
        let robot_after = after.usage_for("Robot").unwrap().used_minutes;
        prop_assert!(robot_after <= robot_before + 1e-6);
    }
}
