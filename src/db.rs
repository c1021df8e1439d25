// ==========================================
// 履约中心人力分配系统 - SQLite 连接与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout
// - 统一建表 / clean_orders 视图
// ==========================================

use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "FULFILLMENT_DB_PATH";

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认工作目录（用户数据目录下,不可用时回退到当前目录）
pub fn default_work_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => data_dir.join("fulfillment-optimizer"),
        None => PathBuf::from("."),
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 FULFILLMENT_DB_PATH,否则位于默认工作目录
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    default_work_dir().join("fulfillment.db")
}

/// 初始化 schema（幂等）
///
/// 说明：原始订单表 `orders` 不在此创建，由导入器按批次整体替换。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS assignment (
            run_id TEXT NOT NULL,
            order_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            processing_minutes REAL NOT NULL,
            cost REAL NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (run_id, order_id)
        );

        CREATE TABLE IF NOT EXISTS violation_record (
            run_id TEXT NOT NULL,
            order_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            rule_name TEXT NOT NULL,
            observed_value REAL NOT NULL,
            threshold REAL NOT NULL,
            severity TEXT NOT NULL,
            PRIMARY KEY (run_id, order_id, rule_name)
        );

        CREATE TABLE IF NOT EXISTS drift_stats (
            run_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            attribute TEXT NOT NULL,
            sample_count INTEGER NOT NULL,
            mean REAL NOT NULL,
            min REAL NOT NULL,
            q1 REAL NOT NULL,
            median REAL NOT NULL,
            q3 REAL NOT NULL,
            max REAL NOT NULL,
            threshold REAL,
            exceed_count INTEGER NOT NULL,
            exceed_ratio REAL NOT NULL,
            max_excess REAL NOT NULL,
            PRIMARY KEY (run_id, class_id, attribute)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// clean_orders 视图统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanViewStats {
    pub raw_rows: usize,
    pub clean_rows: usize,
    pub dropped_rows: usize,
}

/// 创建 clean_orders 视图（先 DROP，保证幂等）
///
/// 清洗口径：
/// - 件数为 NULL 的订单视为无效订单，丢弃
/// - 负重量视为符号录入错误（扫描异常），取绝对值
/// - required_processing_minutes = 件数 × minutes_per_item
///
/// minutes_per_item 由 `ConfigManager::get_minutes_per_item` 校验为有限正数
pub fn create_clean_orders_view(conn: &Connection, minutes_per_item: f64) -> rusqlite::Result<CleanViewStats> {
    conn.execute_batch("DROP VIEW IF EXISTS clean_orders;")?;

    // 视图定义不支持参数绑定，数值直接写入 DDL（已校验为有限正数）
    let create_view_sql = format!(
        r#"
        CREATE VIEW clean_orders AS
        SELECT
            CAST(order_id AS TEXT) AS order_id,
            num_items AS item_count,
            CASE
                WHEN total_weight_kg < 0 THEN ABS(total_weight_kg)
                ELSE total_weight_kg
            END AS weight_kg,
            arrival_timestamp,
            num_items * {minutes_per_item:?} AS required_processing_minutes
        FROM orders
        WHERE num_items IS NOT NULL AND num_items >= 1
        "#
    );
    conn.execute_batch(&create_view_sql)?;

    let raw_rows: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
    let clean_rows: i64 = conn.query_row("SELECT COUNT(*) FROM clean_orders", [], |row| row.get(0))?;

    let stats = CleanViewStats {
        raw_rows: raw_rows as usize,
        clean_rows: clean_rows as usize,
        dropped_rows: (raw_rows - clean_rows).max(0) as usize,
    };
    info!(
        clean_rows = stats.clean_rows,
        dropped_rows = stats.dropped_rows,
        "视图 clean_orders 创建完成"
    );
    Ok(stats)
}
