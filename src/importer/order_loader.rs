// ==========================================
// 履约中心人力分配系统 - 原始订单入库
// ==========================================
// 语义: 整表替换 (DROP + CREATE),单事务提交
// 红线: 入库不做清洗,脏数据原样保留供 DQ 分析
// ==========================================

use crate::domain::order::RawOrderRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::CsvParser;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

// ==========================================
// OrderLoader - 原始订单加载器
// ==========================================
pub struct OrderLoader {
    conn: Arc<Mutex<Connection>>,
    parser: CsvParser,
}

impl OrderLoader {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            parser: CsvParser,
        }
    }

    fn get_conn(&self) -> ImportResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))
    }

    /// 解析 CSV 并整表替换 `orders`
    ///
    /// # 返回
    /// - Ok(usize): 入库行数
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn load_csv(&self, path: &Path) -> ImportResult<usize> {
        let records = self.parser.parse_orders(path)?;
        info!(total_rows = records.len(), "文件解析完成");
        self.load_records(&records)
    }

    /// 整表替换 `orders`（事务化）
    pub fn load_records(&self, records: &[RawOrderRecord]) -> ImportResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        Self::recreate_orders_table_tx(&tx)?;
        let count = Self::batch_insert_orders_tx(&tx, records)?;

        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        info!(count = count, "原始订单入库完成");
        Ok(count)
    }

    /// 视图依赖旧表,一并删除 (由清洗阶段重建)
    fn recreate_orders_table_tx(tx: &Transaction) -> ImportResult<()> {
        tx.execute_batch(
            r#"
            DROP VIEW IF EXISTS clean_orders;
            DROP TABLE IF EXISTS orders;
            CREATE TABLE orders (
                order_id INTEGER PRIMARY KEY,
                num_items INTEGER,
                total_weight_kg REAL NOT NULL,
                arrival_timestamp TEXT
            );
            "#,
        )?;
        Ok(())
    }

    fn batch_insert_orders_tx(tx: &Transaction, records: &[RawOrderRecord]) -> ImportResult<usize> {
        let mut stmt = tx.prepare(
            "INSERT INTO orders (order_id, num_items, total_weight_kg, arrival_timestamp)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        let mut count = 0;
        for record in records {
            stmt.execute(params![
                record.order_id,
                record.num_items,
                record.total_weight_kg,
                record.arrival_timestamp.map(|t| t.to_rfc3339()),
            ])
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.contains("UNIQUE") => {
                    ImportError::DuplicateOrderId {
                        row: record.row_number,
                        order_id: record.order_id,
                    }
                }
                other => ImportError::from(other),
            })?;
            count += 1;
        }

        Ok(count)
    }
}
