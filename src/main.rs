// ==========================================
// 履约中心人力分配系统 - 命令行入口
// ==========================================
// 子命令与流水线阶段一一对应;run 执行全部阶段
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fulfillment_optimizer::config::{ConfigManager, PipelineConfig};
use fulfillment_optimizer::db;
use fulfillment_optimizer::pipeline::{FulfillmentPipeline, PipelinePaths};
use fulfillment_optimizer::report::ExecutiveSummary;
use fulfillment_optimizer::{logging, APP_NAME, VERSION};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fulfillment-optimizer", version, about = "履约中心人力分配优化 + 安全审计")]
struct Cli {
    /// SQLite 数据库路径
    #[arg(long, global = true, env = db::DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// 工作目录 (原始 CSV 与导出文件默认位置)
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// 同时写入日志文件
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// JSON 格式日志
    #[arg(long, global = true, conflicts_with = "log_file")]
    log_json: bool,

    /// 覆写模拟订单数 (仅本次运行)
    #[arg(long, global = true)]
    order_count: Option<usize>,

    /// 覆写随机种子 (仅本次运行)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// 覆写求解时间预算,秒 (0 = 不限时)
    #[arg(long, global = true)]
    solver_time_limit: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 生成模拟原始订单 CSV
    Generate {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 原始订单 CSV 入库 (整表替换)
    Load {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// 数据质量分析
    Analyze,
    /// 重建 clean_orders 视图
    Clean,
    /// 求解成本最优分配并保存
    Optimize,
    /// 审计最近一次分配并保存违规记录
    Audit,
    /// 导出最近一次运行的 BI 文件
    Export {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// 执行完整流水线
    Run,
    /// 配置管理
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// 显示当前配置快照
    Show,
    /// 写入配置项
    Set { key: String, value: String },
}

fn apply_overrides(cli: &Cli, config: &mut PipelineConfig) {
    if let Some(order_count) = cli.order_count {
        config.generator.order_count = order_count;
    }
    if let Some(seed) = cli.seed {
        config.generator.seed = seed;
    }
    if let Some(secs) = cli.solver_time_limit {
        config.solver_time_limit_secs = secs;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match (&cli.log_file, cli.log_json) {
        (Some(path), _) => logging::init_with_log_file(path)
            .with_context(|| format!("无法打开日志文件 {}", path.display()))?,
        (None, true) => logging::init_json(),
        (None, false) => logging::init(),
    }

    tracing::info!("{} v{}", APP_NAME, VERSION);

    let work_dir = cli.work_dir.clone().unwrap_or_else(db::default_work_dir);
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("无法创建工作目录 {}", work_dir.display()))?;
    let db_path = cli.db.clone().unwrap_or_else(db::default_db_path);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::info!(db_path = %db_path.display(), "使用数据库");

    let paths = PipelinePaths::under(&work_dir);

    if let Command::Config { action } = &cli.command {
        let manager = ConfigManager::new(&db_path.to_string_lossy())?;
        match action {
            ConfigAction::Show => println!("{}", manager.get_config_snapshot()?),
            ConfigAction::Set { key, value } => {
                manager.set_global_config_value(key, value)?;
                // 写入后立即校验
                manager.load_pipeline_config()?;
                println!("已更新 {}", key);
            }
        }
        return Ok(());
    }

    let mut pipeline = FulfillmentPipeline::open(&db_path)?;
    apply_overrides(&cli, pipeline.config_mut());

    match cli.command {
        Command::Generate { output } => {
            let output = output.unwrap_or(paths.raw_csv);
            let count = pipeline.generate(&output)?;
            println!("已生成 {} 条订单: {}", count, output.display());
        }
        Command::Load { input } => {
            let input = input.unwrap_or(paths.raw_csv);
            let count = pipeline.load(&input)?;
            println!("已入库 {} 行", count);
        }
        Command::Analyze => {
            let report = pipeline.analyze()?;
            println!(
                "总行数 {}, 件数缺失 {}, 负重量 {}, 可用 {}",
                report.total_rows,
                report.missing_item_count,
                report.negative_weight,
                report.usable_rows()
            );
        }
        Command::Clean => {
            let stats = pipeline.clean()?;
            println!("clean_orders: {} 行 (丢弃 {})", stats.clean_rows, stats.dropped_rows);
        }
        Command::Optimize => {
            let orders = pipeline.clean_orders()?;
            let plan = pipeline.optimize(&orders)?;
            pipeline.persist_plan(&plan)?;
            println!("运行 {} 总成本 {:.2} ({} ms)", plan.run_id, plan.total_cost, plan.solve_duration_ms);
        }
        Command::Audit => {
            let plan = pipeline.latest_plan()?;
            let orders = pipeline.clean_orders()?;
            let audit = pipeline.audit(&plan.assignments, &orders)?;
            pipeline.persist_audit(&plan.run_id, &audit)?;
            println!("{}", ExecutiveSummary::build(&plan, &audit));
        }
        Command::Export { dir } => {
            let dir = dir.unwrap_or(paths.export_dir);
            let plan = pipeline.latest_plan()?;
            let orders = pipeline.clean_orders()?;
            let audit = pipeline.saved_audit(&plan.run_id)?;
            let exported = pipeline.export(&dir, &plan, &orders, &audit)?;
            println!("已导出 {} 行: {}", exported.master_rows, exported.master.display());
        }
        Command::Run => {
            let outcome = pipeline.run(&paths)?;
            println!("{}", outcome.summary);
            println!("BI 主表: {}", outcome.export.master.display());
        }
        Command::Config { .. } => {}
    }

    Ok(())
}
