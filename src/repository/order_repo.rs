// ==========================================
// 履约中心人力分配系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 只读 clean_orders 视图 (清洗口径见 db::create_clean_orders_view)
// ==========================================

use crate::domain::order::Order;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 清洗后订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询全部清洗后订单 (按订单号数值升序)
    ///
    /// # 返回
    /// - Err(RelationMissing): 视图尚未创建
    pub fn list_clean_orders(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, weight_kg, item_count, arrival_timestamp, required_processing_minutes
            FROM clean_orders
            ORDER BY CAST(order_id AS INTEGER)
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;

        let mut orders = Vec::new();
        for row in rows {
            let (order_id, weight_kg, item_count, arrival_raw, required_processing_minutes) = row?;
            let arrival_timestamp = match arrival_raw {
                None => None,
                Some(raw) => Some(
                    DateTime::parse_from_rfc3339(&raw)
                        .map_err(|e| RepositoryError::FieldValueError {
                            field: "arrival_timestamp".to_string(),
                            message: format!("order_id={}: {}", order_id, e),
                        })?
                        .with_timezone(&Utc),
                ),
            };
            orders.push(Order {
                order_id,
                weight_kg,
                item_count,
                arrival_timestamp,
                required_processing_minutes,
            });
        }

        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_clean_orders_view;

    #[test]
    fn test_list_clean_orders() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE orders (
                order_id INTEGER PRIMARY KEY,
                num_items INTEGER,
                total_weight_kg REAL NOT NULL,
                arrival_timestamp TEXT
            );
            INSERT INTO orders VALUES (10, 2, -4.5, '2024-03-01T08:00:00+00:00');
            INSERT INTO orders VALUES (2, NULL, 1.0, NULL);
            INSERT INTO orders VALUES (3, 5, 12.0, NULL);
            "#,
        )
        .unwrap();
        create_clean_orders_view(&conn, 2.0).unwrap();

        let repo = OrderRepository::from_connection(Arc::new(Mutex::new(conn)));
        let orders = repo.list_clean_orders().unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, "3");
        assert_eq!(orders[0].required_processing_minutes, 10.0);
        assert_eq!(orders[1].order_id, "10");
        assert_eq!(orders[1].weight_kg, 4.5);
        assert!(orders[1].arrival_timestamp.is_some());
    }

    #[test]
    fn test_missing_view() {
        let repo = OrderRepository::from_connection(Arc::new(Mutex::new(
            Connection::open_in_memory().unwrap(),
        )));
        assert!(matches!(
            repo.list_clean_orders(),
            Err(RepositoryError::RelationMissing(_))
        ));
    }
}
