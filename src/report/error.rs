// ==========================================
// 履约中心人力分配系统 - 报表层错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("文件写入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 写出失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("分配引用了不存在的订单: {0}")]
    UnknownOrder(String),
}

pub type ReportResult<T> = Result<T, ReportError>;
