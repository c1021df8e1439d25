// ==========================================
// 履约中心人力分配系统 - 导入层
// ==========================================
// 职责: 原始订单 CSV 解析、整表入库、数据质量分析
// ==========================================

// 模块声明
pub mod dq_analyzer;
pub mod error;
pub mod file_parser;
pub mod order_loader;

// 重导出核心类型
pub use dq_analyzer::DqAnalyzer;
pub use error::{ImportError, ImportResult};
pub use file_parser::CsvParser;
pub use order_loader::OrderLoader;
