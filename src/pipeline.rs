// ==========================================
// 履约中心人力分配系统 - 流水线编排
// ==========================================
// 阶段: 生成 → 入库 → DQ 分析 → 清洗 → 优化 → 审计 → 持久化 → 导出
// 红线: 任一阶段失败立即终止,不产出部分结果
// 红线: 优化与审计相互独立,审计结果不回灌优化器
// ==========================================

use crate::config::{ConfigManager, PipelineConfig};
use crate::db::{self, CleanViewStats};
use crate::domain::assignment::{Assignment, AssignmentPlan};
use crate::domain::order::Order;
use crate::domain::quality::DqReport;
use crate::domain::violation::AuditReport;
use crate::domain::worker::CapacityUsage;
use crate::engine::{AssignmentOptimizer, SafetyAuditor};
use crate::generator::OrderGenerator;
use crate::importer::{DqAnalyzer, OrderLoader};
use crate::report::{BiExporter, ExecutiveSummary, ExportPaths};
use crate::repository::{AssignmentRepository, DriftRepository, OrderRepository, ViolationRepository};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

// ==========================================
// PipelinePaths - 一次完整运行的文件位置
// ==========================================
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub raw_csv: PathBuf,
    pub export_dir: PathBuf,
}

impl PipelinePaths {
    /// 在指定目录下使用默认文件名
    pub fn under(dir: &Path) -> Self {
        Self {
            raw_csv: dir.join("raw_orders.csv"),
            export_dir: dir.join("bi_export"),
        }
    }
}

// ==========================================
// PipelineOutcome - 完整运行结果
// ==========================================
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub generated_orders: usize,
    pub loaded_rows: usize,
    pub dq_report: DqReport,
    pub clean_stats: CleanViewStats,
    pub plan: AssignmentPlan,
    pub audit: AuditReport,
    pub summary: ExecutiveSummary,
    pub export: ExportPaths,
}

// ==========================================
// FulfillmentPipeline - 流水线编排器
// ==========================================
pub struct FulfillmentPipeline {
    conn: Arc<Mutex<Connection>>,
    config: PipelineConfig,
}

impl FulfillmentPipeline {
    /// 打开数据库并从 config_kv 加载运行参数
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = db::open_sqlite_connection(&db_path.to_string_lossy())
            .with_context(|| format!("无法打开数据库 {}", db_path.display()))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = ConfigManager::from_connection(conn.clone())
            .context("初始化配置管理器失败")?
            .load_pipeline_config()
            .context("加载运行参数失败")?;

        Ok(Self { conn, config })
    }

    /// 使用已有连接与显式参数 (测试/嵌入场景)
    pub fn from_connection(conn: Arc<Mutex<Connection>>, config: PipelineConfig) -> Result<Self> {
        {
            let guard = conn.lock().map_err(|e| anyhow!("锁获取失败: {}", e))?;
            db::configure_sqlite_connection(&guard)?;
            db::init_schema(&guard).context("初始化 schema 失败")?;
        }
        Ok(Self { conn, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 本次运行的参数覆写 (不回写 config_kv)
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    // ==========================================
    // 单阶段
    // ==========================================

    /// 阶段 1: 生成模拟订单 CSV
    pub fn generate(&self, raw_csv: &Path) -> Result<usize> {
        let records = OrderGenerator::new(self.config.generator.clone())
            .write_csv(raw_csv)
            .with_context(|| format!("生成模拟订单失败: {}", raw_csv.display()))?;
        Ok(records.len())
    }

    /// 阶段 2: 原始订单入库 (整表替换)
    pub fn load(&self, raw_csv: &Path) -> Result<usize> {
        OrderLoader::from_connection(self.conn.clone())
            .load_csv(raw_csv)
            .with_context(|| format!("导入原始订单失败: {}", raw_csv.display()))
    }

    /// 阶段 3: 数据质量分析
    pub fn analyze(&self) -> Result<DqReport> {
        DqAnalyzer::from_connection(self.conn.clone())
            .analyze()
            .context("数据质量分析失败")
    }

    /// 阶段 4: 重建 clean_orders 视图
    pub fn clean(&self) -> Result<CleanViewStats> {
        let conn = self.conn.lock().map_err(|e| anyhow!("锁获取失败: {}", e))?;
        db::create_clean_orders_view(&conn, self.config.minutes_per_item).context("创建 clean_orders 视图失败")
    }

    /// 读取清洗后订单
    pub fn clean_orders(&self) -> Result<Vec<Order>> {
        OrderRepository::from_connection(self.conn.clone())
            .list_clean_orders()
            .context("读取清洗后订单失败")
    }

    /// 阶段 5: 成本最优分配
    pub fn optimize(&self, orders: &[Order]) -> Result<AssignmentPlan> {
        let optimizer = AssignmentOptimizer::new(self.config.optimizer_config());
        let plan = optimizer
            .optimize(orders, &self.config.worker_classes)
            .context("求解分配方案失败")?;
        Ok(plan)
    }

    /// 按当前配置构建审计器 (规则配置无效时报错)
    pub fn safety_auditor(&self) -> Result<SafetyAuditor> {
        let registry = self.config.rule_registry().context("安全规则配置无效")?;
        if registry.is_empty() {
            warn!("未配置任何安全规则,审计仅输出分布统计");
        }
        Ok(SafetyAuditor::new(registry))
    }

    /// 阶段 6: 安全审计
    pub fn audit(&self, assignments: &[Assignment], orders: &[Order]) -> Result<AuditReport> {
        self.run_audit(&self.safety_auditor()?, assignments, orders)
    }

    fn run_audit(
        &self,
        auditor: &SafetyAuditor,
        assignments: &[Assignment],
        orders: &[Order],
    ) -> Result<AuditReport> {
        auditor.audit(assignments, orders).context("安全审计失败")
    }

    /// 阶段 7a: 持久化分配方案
    pub fn persist_plan(&self, plan: &AssignmentPlan) -> Result<usize> {
        AssignmentRepository::from_connection(self.conn.clone())
            .save_plan(plan)
            .context("保存分配方案失败")
    }

    /// 阶段 7b: 持久化审计结果
    pub fn persist_audit(&self, run_id: &str, audit: &AuditReport) -> Result<()> {
        ViolationRepository::from_connection(self.conn.clone())
            .save_for_run(run_id, &audit.violations)
            .context("保存违规记录失败")?;
        DriftRepository::from_connection(self.conn.clone())
            .save_for_run(run_id, &audit.drift)
            .context("保存漂移统计失败")?;
        Ok(())
    }

    /// 阶段 8: BI 导出
    pub fn export(
        &self,
        export_dir: &Path,
        plan: &AssignmentPlan,
        orders: &[Order],
        audit: &AuditReport,
    ) -> Result<ExportPaths> {
        BiExporter::new(export_dir)
            .export(plan, orders, audit)
            .with_context(|| format!("BI 导出失败: {}", export_dir.display()))
    }

    // ==========================================
    // 跨进程续跑 (CLI 单阶段命令使用)
    // ==========================================

    /// 读取最近一次保存的分配方案
    ///
    /// 产能占用按当前工种配置重算;求解耗时不保存,记为 0
    pub fn latest_plan(&self) -> Result<AssignmentPlan> {
        let repo = AssignmentRepository::from_connection(self.conn.clone());
        let run_id = repo
            .latest_run_id()?
            .ok_or_else(|| anyhow!("尚无已保存的分配方案,请先执行 optimize"))?;
        let assignments = repo.list_by_run(&run_id)?;
        Ok(self.rebuild_plan(run_id, assignments))
    }

    /// 读取指定运行已保存的审计结果
    pub fn saved_audit(&self, run_id: &str) -> Result<AuditReport> {
        let violations = ViolationRepository::from_connection(self.conn.clone()).list_by_run(run_id)?;
        let drift = DriftRepository::from_connection(self.conn.clone()).list_by_run(run_id)?;
        let audited_orders = AssignmentRepository::from_connection(self.conn.clone())
            .list_by_run(run_id)?
            .len();
        Ok(AuditReport {
            violations,
            drift,
            audited_orders,
        })
    }

    fn rebuild_plan(&self, run_id: String, assignments: Vec<Assignment>) -> AssignmentPlan {
        let class_usage: Vec<CapacityUsage> = self
            .config
            .worker_classes
            .iter()
            .map(|class| {
                let mut usage = CapacityUsage::empty(class);
                for a in assignments.iter().filter(|a| a.class_id == class.class_id) {
                    usage.used_minutes += a.processing_minutes;
                    usage.order_count += 1;
                    usage.total_cost += a.cost;
                }
                usage
            })
            .collect();

        AssignmentPlan {
            run_id,
            total_cost: assignments.iter().map(|a| a.cost).sum(),
            assignments,
            class_usage,
            solve_duration_ms: 0,
            created_at: Utc::now(),
        }
    }

    // ==========================================
    // 完整运行
    // ==========================================

    /// 依次执行全部阶段
    pub fn run(&self, paths: &PipelinePaths) -> Result<PipelineOutcome> {
        let started = Instant::now();
        info!(
            raw_csv = %paths.raw_csv.display(),
            export_dir = %paths.export_dir.display(),
            "开始执行履约分配流水线"
        );

        // 规则在求解前校验,配置错误不必等待求解
        let auditor = self.safety_auditor()?;

        info!("阶段 1/8: 生成模拟订单");
        let generated_orders = self.generate(&paths.raw_csv)?;

        info!("阶段 2/8: 原始订单入库");
        let loaded_rows = self.load(&paths.raw_csv)?;

        info!("阶段 3/8: 数据质量分析");
        let dq_report = self.analyze()?;

        info!("阶段 4/8: 清洗");
        let clean_stats = self.clean()?;
        let orders = self.clean_orders()?;

        info!(order_count = orders.len(), "阶段 5/8: 成本最优分配");
        let plan = self.optimize(&orders)?;

        info!(run_id = %plan.run_id, "阶段 6/8: 安全审计");
        let audit = self.run_audit(&auditor, &plan.assignments, &orders)?;

        info!("阶段 7/8: 持久化");
        self.persist_plan(&plan)?;
        self.persist_audit(&plan.run_id, &audit)?;

        info!("阶段 8/8: BI 导出");
        let export = self.export(&paths.export_dir, &plan, &orders, &audit)?;

        let summary = ExecutiveSummary::build(&plan, &audit);
        info!(
            run_id = %plan.run_id,
            total_cost = plan.total_cost,
            violation_count = audit.violations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "流水线执行完成"
        );

        Ok(PipelineOutcome {
            generated_orders,
            loaded_rows,
            dq_report,
            clean_stats,
            plan,
            audit,
            summary,
            export,
        })
    }
}
