// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别
// 流水线运行可同时输出到控制台与日志文件
// ==========================================

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    // 从环境变量读取日志级别，默认为 info
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=fulfillment_optimizer=trace
///
/// # 示例
/// ```no_run
/// use fulfillment_optimizer::logging;
/// logging::init();
/// ```
pub fn init() {
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// 初始化 JSON 格式日志（供日志采集使用）
pub fn init_json() {
    let _ = fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(true)
        .try_init();
}

/// 初始化日志系统，同时追加写入日志文件
///
/// 文件不存在时创建；上级目录需已存在或可创建
pub fn init_with_log_file(log_path: &Path) -> io::Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file: File = OpenOptions::new().create(true).append(true).open(log_path)?;

    let _ = fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(io::stdout.and(Mutex::new(file)))
        .try_init();
    Ok(())
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
