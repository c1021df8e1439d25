// ==========================================
// 履约中心人力分配系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::pipeline_config::{GeneratorConfig, PipelineConfig};
use crate::db::open_sqlite_connection;
use crate::domain::worker::WorkerClass;
use crate::engine::rules::RuleDefinition;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| ConfigError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            crate::db::init_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ConfigError::ConfigReadError {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取数值配置，不存在时使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::ConfigValueError {
                key: key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 在每次运行时记录配置快照，便于复现
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    // ===== 工种与规则 =====

    /// 获取工种配置
    ///
    /// 配置格式为 JSON 数组: [{"class_id": "Robot", "cost_per_hour": 5.0, ...}]
    /// 配置不存在时返回默认工种 (Robot + Human)
    pub fn get_worker_classes(&self) -> ConfigResult<Vec<WorkerClass>> {
        match self.get_config_value(config_keys::WORKER_CLASSES)? {
            None => Ok(WorkerClass::default_classes()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| ConfigError::ConfigValueError {
                key: config_keys::WORKER_CLASSES.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// 获取自定义安全规则
    ///
    /// # 返回
    /// - None: 未配置（由工种阈值派生标准规则）
    /// - Some(Vec<RuleDefinition>): 声明式规则（校验由审计层完成）
    pub fn get_safety_rules(&self) -> ConfigResult<Option<Vec<RuleDefinition>>> {
        match self.get_config_value(config_keys::SAFETY_RULES)? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| ConfigError::ConfigValueError {
                    key: config_keys::SAFETY_RULES.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }

    // ===== 求解与清洗 =====

    /// 求解时间预算（秒，0 = 不限时）
    pub fn get_solver_time_limit_secs(&self) -> ConfigResult<u64> {
        self.get_parsed_or_default(config_keys::SOLVER_TIME_LIMIT_SECS, 60)
    }

    /// 每件处理分钟数（派生 required_processing_minutes，必须为有限正数）
    pub fn get_minutes_per_item(&self) -> ConfigResult<f64> {
        let minutes: f64 = self.get_parsed_or_default(config_keys::MINUTES_PER_ITEM, 1.0)?;
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(ConfigError::ConfigValueError {
                key: config_keys::MINUTES_PER_ITEM.to_string(),
                value: minutes.to_string(),
                message: "必须为正数".to_string(),
            });
        }
        Ok(minutes)
    }

    // ===== 模拟数据 =====

    pub fn get_generator_config(&self) -> ConfigResult<GeneratorConfig> {
        let defaults = GeneratorConfig::default();
        Ok(GeneratorConfig {
            order_count: self.get_parsed_or_default(config_keys::GENERATOR_ORDER_COUNT, defaults.order_count)?,
            corruption_rate: self
                .get_parsed_or_default(config_keys::GENERATOR_CORRUPTION_RATE, defaults.corruption_rate)?,
            seed: self.get_parsed_or_default(config_keys::GENERATOR_SEED, defaults.seed)?,
            ..defaults
        })
    }

    /// 汇总一次运行所需全部配置
    pub fn load_pipeline_config(&self) -> ConfigResult<PipelineConfig> {
        Ok(PipelineConfig {
            worker_classes: self.get_worker_classes()?,
            safety_rules: self.get_safety_rules()?,
            solver_time_limit_secs: self.get_solver_time_limit_secs()?,
            minutes_per_item: self.get_minutes_per_item()?,
            generator: self.get_generator_config()?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 工种 (JSON 数组)
    pub const WORKER_CLASSES: &str = "worker_classes";

    // 安全规则 (JSON 数组, 可选)
    pub const SAFETY_RULES: &str = "safety_rules";

    // 求解
    pub const SOLVER_TIME_LIMIT_SECS: &str = "solver_time_limit_secs";

    // 清洗
    pub const MINUTES_PER_ITEM: &str = "minutes_per_item";

    // 模拟数据
    pub const GENERATOR_ORDER_COUNT: &str = "generator_order_count";
    pub const GENERATOR_CORRUPTION_RATE: &str = "generator_corruption_rate";
    pub const GENERATOR_SEED: &str = "generator_seed";
}
