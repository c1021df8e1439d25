// ==========================================
// 履约中心人力分配系统 - 成本最优分配引擎
// ==========================================
// 红线: 每个订单恰好分配给一个工种,不允许部分分配或静默丢单
// 红线: 工种分配分钟数之和不得超过班次产能
// ==========================================
// 职责: 构建并求解 0-1 整数规划 (MIP)
// 输入: 清洗后订单 + 工种费率/产能
// 输出: AssignmentPlan (分配表 + 产能占用 + 目标函数值)
// ==========================================
// 模型:
//   变量  x[o][c] ∈ {0,1}            订单 o 由工种 c 处理
//   目标  min Σ x[o][c] · m(o) · r(c)  m=所需分钟, r=分钟成本
//   约束  ∀o Σ_c x[o][c] = 1          完整性
//         ∀c Σ_o x[o][c] · m(o) ≤ C(c) 产能
// ==========================================

use crate::domain::assignment::{Assignment, AssignmentPlan};
use crate::domain::order::Order;
use crate::domain::worker::{CapacityConstraint, CapacityUsage, WorkerClass, CAPACITY_EPSILON};
use crate::engine::error::{OptimizerError, OptimizerResult};
use chrono::Utc;
use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolutionStatus, SolverModel, Variable, WithTimeLimit,
};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 0-1 变量取值判定阈值
const INDICATOR_THRESHOLD: f64 = 0.5;

// ==========================================
// OptimizerConfig - 求解配置
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct OptimizerConfig {
    /// 求解时间预算 (None = 不限时)
    pub time_limit: Option<Duration>,
}

impl OptimizerConfig {
    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self {
            time_limit: Some(time_limit),
        }
    }
}

// ==========================================
// MipProblem - 与领域对象解耦的求解输入
// ==========================================
#[derive(Debug, Clone)]
struct MipProblem {
    minutes: Vec<f64>,          // 每个订单所需分钟
    cost_per_minute: Vec<f64>,  // 每个工种分钟成本
    capacity: Vec<f64>,         // 每个工种产能
}

impl MipProblem {
    /// 构建并求解模型,返回 x[o][c] 取值矩阵
    ///
    /// 有时间预算时交给 microlp 自行中止;未证明最优的解一律视为超时
    fn solve(&self, time_limit: Option<Duration>) -> OptimizerResult<Vec<Vec<f64>>> {
        let mut vars = ProblemVariables::new();

        // 1. 决策变量: 每个 (订单, 工种) 一个 0-1 指示变量
        let x: Vec<Vec<Variable>> = self
            .minutes
            .iter()
            .map(|_| {
                self.cost_per_minute
                    .iter()
                    .map(|_| vars.add(variable().binary()))
                    .collect()
            })
            .collect();

        // 2. 目标函数: Σ x · 分钟 · 分钟成本
        let objective: Expression = x
            .iter()
            .zip(self.minutes.iter())
            .flat_map(|(row, &m)| {
                row.iter()
                    .zip(self.cost_per_minute.iter())
                    .map(move |(&var, &rate)| (m * rate) * var)
            })
            .sum();

        let mut model = vars.minimise(objective).using(microlp);
        if let Some(limit) = time_limit {
            model = model.with_time_limit(limit.as_secs_f64());
        }

        // 3. 约束1: 完整性 (每个订单恰好一个工种)
        for row in x.iter() {
            let switches: Expression = row.iter().map(|&var| Expression::from(var)).sum();
            model = model.with(constraint!(switches == 1.0));
        }

        // 4. 约束2: 工种产能
        for (c, &limit) in self.capacity.iter().enumerate() {
            let load: Expression = x
                .iter()
                .zip(self.minutes.iter())
                .map(|(row, &m)| m * row[c])
                .sum();
            model = model.with(constraint!(load <= limit));
        }

        // 5. 求解
        let solution = model.solve().map_err(|e| match (e, time_limit) {
            (ResolutionError::Infeasible, _) => OptimizerError::InfeasibilityError {
                demand_minutes: self.minutes.iter().sum(),
                capacity_minutes: self.capacity.iter().sum(),
                message: "求解器判定不可行 (订单无法装入各工种产能)".to_string(),
            },
            // 预算耗尽且尚无可行解
            (ResolutionError::Other(_), Some(limit)) => timeout_error(limit),
            (other, _) => OptimizerError::SolverError(other.to_string()),
        })?;

        // 预算内只拿到可行解 (未证明最优),不返回
        if !matches!(solution.status(), SolutionStatus::Optimal) {
            return Err(match time_limit {
                Some(limit) => timeout_error(limit),
                None => OptimizerError::SolverError(format!(
                    "求解器未证明最优: {:?}",
                    solution.status()
                )),
            });
        }

        Ok(x.iter()
            .map(|row| row.iter().map(|&var| solution.value(var)).collect())
            .collect())
    }
}

fn timeout_error(limit: Duration) -> OptimizerError {
    warn!(limit_ms = limit.as_millis() as u64, "求解超时");
    OptimizerError::SolverTimeoutError {
        limit_ms: limit.as_millis() as u64,
    }
}

// ==========================================
// AssignmentOptimizer - 成本最优分配引擎
// ==========================================
pub struct AssignmentOptimizer {
    config: OptimizerConfig,
}

impl AssignmentOptimizer {
    /// 构造函数
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 求解成本最优分配
    ///
    /// # 参数
    /// - `orders`: 清洗后订单 (只读)
    /// - `classes`: 工种列表 (只读)
    ///
    /// # 返回
    /// - Ok(AssignmentPlan): 覆盖全部订单的分配方案
    /// - Err(ConfigurationError): 无工种 / 成本或产能非正 / 订单分钟非正 / 重复 ID
    /// - Err(InfeasibilityError): 无满足产能的分配
    /// - Err(SolverTimeoutError): 超过时间预算
    #[instrument(skip(self, orders, classes), fields(
        order_count = orders.len(),
        class_count = classes.len()
    ))]
    pub fn optimize(
        &self,
        orders: &[Order],
        classes: &[WorkerClass],
    ) -> OptimizerResult<AssignmentPlan> {
        let started = Instant::now();

        // 1. 输入校验
        self.validate(orders, classes)?;

        // 2. 可行性预检 (总量)
        self.precheck_feasibility(orders, classes)?;

        // 3. 求解
        let values = if orders.is_empty() {
            Vec::new()
        } else {
            let problem = MipProblem {
                minutes: orders.iter().map(|o| o.required_processing_minutes).collect(),
                cost_per_minute: classes.iter().map(|c| c.cost_per_minute()).collect(),
                capacity: classes.iter().map(|c| c.max_capacity_minutes).collect(),
            };
            debug!(
                variables = orders.len() * classes.len(),
                constraints = orders.len() + classes.len(),
                "MIP 模型构建完成,开始求解"
            );
            problem.solve(self.config.time_limit)?
        };

        // 4. 提取分配 + 复核
        let plan = self.extract_plan(orders, classes, &values, started.elapsed())?;

        info!(
            run_id = %plan.run_id,
            total_cost = plan.total_cost,
            solve_duration_ms = plan.solve_duration_ms,
            "分配求解完成"
        );
        for usage in plan.class_usage.iter() {
            info!(
                class_id = %usage.class_id,
                order_count = usage.order_count,
                used_minutes = usage.used_minutes,
                capacity_minutes = usage.capacity_minutes,
                total_cost = usage.total_cost,
                "工种分配汇总"
            );
        }

        Ok(plan)
    }

    // ==========================================
    // 校验
    // ==========================================

    fn validate(&self, orders: &[Order], classes: &[WorkerClass]) -> OptimizerResult<()> {
        if classes.is_empty() {
            return Err(OptimizerError::ConfigurationError(
                "至少需要一个工种".to_string(),
            ));
        }

        let mut seen_classes = HashSet::new();
        for class in classes {
            if !seen_classes.insert(class.class_id.as_str()) {
                return Err(OptimizerError::ConfigurationError(format!(
                    "工种重复: {}",
                    class.class_id
                )));
            }
            if !class.cost_per_hour.is_finite() || class.cost_per_hour <= 0.0 {
                return Err(OptimizerError::ConfigurationError(format!(
                    "工种 {} 小时成本必须为正数: {}",
                    class.class_id, class.cost_per_hour
                )));
            }
            if !class.max_capacity_minutes.is_finite() || class.max_capacity_minutes <= 0.0 {
                return Err(OptimizerError::ConfigurationError(format!(
                    "工种 {} 产能必须为正数: {}",
                    class.class_id, class.max_capacity_minutes
                )));
            }
        }

        let mut seen_orders = HashSet::new();
        for order in orders {
            if !seen_orders.insert(order.order_id.as_str()) {
                return Err(OptimizerError::ConfigurationError(format!(
                    "订单号重复: {}",
                    order.order_id
                )));
            }
            let minutes = order.required_processing_minutes;
            if !minutes.is_finite() || minutes <= 0.0 {
                return Err(OptimizerError::ConfigurationError(format!(
                    "订单 {} 所需处理时长必须为正数: {}",
                    order.order_id, minutes
                )));
            }
        }

        Ok(())
    }

    /// 总量预检: 需求超过总产能 / 单订单超过最大单工种产能
    fn precheck_feasibility(&self, orders: &[Order], classes: &[WorkerClass]) -> OptimizerResult<()> {
        let demand_minutes: f64 = orders.iter().map(|o| o.required_processing_minutes).sum();
        let capacity_minutes: f64 = classes.iter().map(|c| c.max_capacity_minutes).sum();

        if demand_minutes > capacity_minutes + CAPACITY_EPSILON {
            warn!(demand_minutes, capacity_minutes, "订单总需求超过工种总产能");
            return Err(OptimizerError::InfeasibilityError {
                demand_minutes,
                capacity_minutes,
                message: "请减少订单量或增加产能".to_string(),
            });
        }

        let largest_capacity = classes
            .iter()
            .map(|c| c.max_capacity_minutes)
            .fold(0.0_f64, f64::max);
        if let Some(order) = orders
            .iter()
            .find(|o| o.required_processing_minutes > largest_capacity + CAPACITY_EPSILON)
        {
            return Err(OptimizerError::InfeasibilityError {
                demand_minutes,
                capacity_minutes,
                message: format!(
                    "订单 {} 需要 {:.2} 分钟,超过任一工种产能 ({:.2})",
                    order.order_id, order.required_processing_minutes, largest_capacity
                ),
            });
        }

        Ok(())
    }

    // ==========================================
    // 结果提取
    // ==========================================

    fn extract_plan(
        &self,
        orders: &[Order],
        classes: &[WorkerClass],
        values: &[Vec<f64>],
        elapsed: Duration,
    ) -> OptimizerResult<AssignmentPlan> {
        let mut usage: Vec<CapacityUsage> = classes.iter().map(CapacityUsage::empty).collect();
        let mut assignments = Vec::with_capacity(orders.len());

        for (order, row) in orders.iter().zip(values.iter()) {
            let chosen: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(_, &v)| v > INDICATOR_THRESHOLD)
                .map(|(c, _)| c)
                .collect();

            // 完整性复核: 恰好一个工种
            let c = match chosen.as_slice() {
                [c] => *c,
                _ => {
                    return Err(OptimizerError::SolverError(format!(
                        "订单 {} 分配到 {} 个工种 (应为 1)",
                        order.order_id,
                        chosen.len()
                    )))
                }
            };

            let class = &classes[c];
            let minutes = order.required_processing_minutes;
            let cost = class.cost_for(minutes);

            usage[c].used_minutes += minutes;
            usage[c].order_count += 1;
            usage[c].total_cost += cost;

            assignments.push(Assignment {
                order_id: order.order_id.clone(),
                class_id: class.class_id.clone(),
                processing_minutes: minutes,
                cost,
            });
        }

        // 产能复核
        if let Some(over) = usage.iter().find(|u| u.is_overflow()) {
            return Err(OptimizerError::SolverError(format!(
                "工种 {} 分配 {:.2} 分钟,超过产能 {:.2}",
                over.class_id, over.used_minutes, over.capacity_minutes
            )));
        }

        let total_cost = assignments.iter().map(|a| a.cost).sum();

        Ok(AssignmentPlan {
            run_id: Uuid::new_v4().to_string(),
            assignments,
            total_cost,
            class_usage: usage,
            solve_duration_ms: elapsed.as_millis() as u64,
            created_at: Utc::now(),
        })
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for AssignmentOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}
