// ==========================================
// 履约中心人力分配系统 - 原始订单 CSV 解析
// ==========================================
// 阶段 0: 文件读取 → 行记录 (表头 → 单元格)
// 阶段 1: 行记录 → RawOrderRecord (类型转换, 空单元格 = NULL)
// ==========================================

use crate::domain::order::RawOrderRecord;
use crate::importer::error::{ImportError, ImportResult};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

/// 原始订单文件列名
pub mod columns {
    pub const ORDER_ID: &str = "order_id";
    pub const NUM_ITEMS: &str = "num_items";
    pub const TOTAL_WEIGHT_KG: &str = "total_weight_kg";
    pub const ARRIVAL_TIMESTAMP: &str = "arrival_timestamp";
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 读取 CSV 为行记录
    ///
    /// 每行一个 map (表头 → 去空白单元格);完全空白的行被跳过
    pub fn parse_to_raw_records(&self, path: &Path) -> ImportResult<Vec<HashMap<String, String>>> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        if let Some(ext) = path.extension() {
            if ext != "csv" {
                return Err(ImportError::UnsupportedFormat(ext.to_string_lossy().to_string()));
            }
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(records)
    }

    /// 解析原始订单文件
    ///
    /// # 返回
    /// - Err(MissingColumn): 缺少 order_id / num_items / total_weight_kg 列
    /// - Err(TypeConversionError): 数值单元格无法解析 (带行号)
    /// - Err(DuplicateOrderId): 同一文件内订单号重复
    pub fn parse_orders(&self, path: &Path) -> ImportResult<Vec<RawOrderRecord>> {
        let rows = self.parse_to_raw_records(path)?;

        if let Some(first) = rows.first() {
            for required in [columns::ORDER_ID, columns::NUM_ITEMS, columns::TOTAL_WEIGHT_KG] {
                if !first.contains_key(required) {
                    return Err(ImportError::MissingColumn(required.to_string()));
                }
            }
        }

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            // 表头占第 1 行
            let row_number = idx + 2;
            let record = parse_order_row(row_number, row)?;
            if !seen.insert(record.order_id) {
                return Err(ImportError::DuplicateOrderId {
                    row: row_number,
                    order_id: record.order_id,
                });
            }
            records.push(record);
        }

        Ok(records)
    }
}

fn cell<'a>(row: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    row.get(column).map(String::as_str).filter(|v| !v.is_empty())
}

fn conversion_error(row: usize, field: &str, message: impl ToString) -> ImportError {
    ImportError::TypeConversionError {
        row,
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// 单行类型转换
fn parse_order_row(row_number: usize, row: &HashMap<String, String>) -> ImportResult<RawOrderRecord> {
    let order_id = cell(row, columns::ORDER_ID)
        .ok_or(ImportError::PrimaryKeyMissing(row_number))?
        .parse::<i64>()
        .map_err(|e| conversion_error(row_number, columns::ORDER_ID, e))?;

    // 件数允许为空 (传感器漏扫);"3.0" 形式同样接受
    let num_items = match cell(row, columns::NUM_ITEMS) {
        None => None,
        Some(raw) => {
            let value = raw
                .parse::<f64>()
                .map_err(|e| conversion_error(row_number, columns::NUM_ITEMS, e))?;
            if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
                return Err(conversion_error(
                    row_number,
                    columns::NUM_ITEMS,
                    format!("件数必须为非负整数: {}", raw),
                ));
            }
            Some(value as u32)
        }
    };

    let total_weight_kg = cell(row, columns::TOTAL_WEIGHT_KG)
        .ok_or_else(|| conversion_error(row_number, columns::TOTAL_WEIGHT_KG, "重量缺失"))?
        .parse::<f64>()
        .map_err(|e| conversion_error(row_number, columns::TOTAL_WEIGHT_KG, e))?;
    if !total_weight_kg.is_finite() {
        return Err(conversion_error(row_number, columns::TOTAL_WEIGHT_KG, "重量必须为有限数"));
    }

    let arrival_timestamp = match cell(row, columns::ARRIVAL_TIMESTAMP) {
        None => None,
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| conversion_error(row_number, columns::ARRIVAL_TIMESTAMP, e))?
                .with_timezone(&Utc),
        ),
    };

    Ok(RawOrderRecord {
        row_number,
        order_id,
        num_items,
        total_weight_kg,
        arrival_timestamp,
    })
}
