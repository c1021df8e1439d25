// ==========================================
// 履约中心人力分配系统 - 漂移统计仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 语义: 按 run_id 整体替换
// ==========================================

use crate::domain::types::OrderAttribute;
use crate::domain::violation::DriftStats;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct DriftRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DriftRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存一次运行的漂移统计（事务化,按 run_id 替换）
    pub fn save_for_run(&self, run_id: &str, drift: &[DriftStats]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute("DELETE FROM drift_stats WHERE run_id = ?1", params![run_id])?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO drift_stats (
                    run_id, class_id, attribute, sample_count, mean, min, q1, median, q3, max,
                    threshold, exceed_count, exceed_ratio, max_excess
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )?;
            for s in drift {
                stmt.execute(params![
                    run_id,
                    s.class_id,
                    s.attribute.as_str(),
                    s.sample_count as i64,
                    s.mean,
                    s.min,
                    s.q1,
                    s.median,
                    s.q3,
                    s.max,
                    s.threshold,
                    s.exceed_count as i64,
                    s.exceed_ratio,
                    s.max_excess,
                ])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    /// 查询指定运行的漂移统计 (按工种、属性排序)
    pub fn list_by_run(&self, run_id: &str) -> RepositoryResult<Vec<DriftStats>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT class_id, attribute, sample_count, mean, min, q1, median, q3, max,
                   threshold, exceed_count, exceed_ratio, max_excess
            FROM drift_stats
            WHERE run_id = ?1
            ORDER BY class_id, attribute
            "#,
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                DriftStats {
                    class_id: String::new(),
                    attribute: OrderAttribute::WeightKg,
                    sample_count: row.get::<_, i64>(2)? as usize,
                    mean: row.get(3)?,
                    min: row.get(4)?,
                    q1: row.get(5)?,
                    median: row.get(6)?,
                    q3: row.get(7)?,
                    max: row.get(8)?,
                    threshold: row.get(9)?,
                    exceed_count: row.get::<_, i64>(10)? as usize,
                    exceed_ratio: row.get(11)?,
                    max_excess: row.get(12)?,
                },
            ))
        })?;

        let mut stats = Vec::new();
        for row in rows {
            let (class_id, attribute_raw, mut s) = row?;
            s.class_id = class_id;
            s.attribute = attribute_raw
                .parse::<OrderAttribute>()
                .map_err(|message| RepositoryError::FieldValueError {
                    field: "attribute".to_string(),
                    message,
                })?;
            stats.push(s);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn stats(class_id: &str, threshold: Option<f64>) -> DriftStats {
        DriftStats {
            class_id: class_id.to_string(),
            attribute: OrderAttribute::WeightKg,
            sample_count: 4,
            mean: 5.0,
            min: 2.0,
            q1: 3.5,
            median: 5.0,
            q3: 6.5,
            max: 8.0,
            threshold,
            exceed_count: if threshold.is_some() { 2 } else { 0 },
            exceed_ratio: if threshold.is_some() { 0.5 } else { 0.0 },
            max_excess: if threshold.is_some() { 3.0 } else { 0.0 },
        }
    }

    #[test]
    fn test_save_and_list_with_optional_threshold() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = DriftRepository::from_connection(Arc::new(Mutex::new(conn)));

        let saved = vec![stats("Human", None), stats("Robot", Some(5.0))];
        assert_eq!(repo.save_for_run("R1", &saved).unwrap(), 2);

        let stored = repo.list_by_run("R1").unwrap();
        assert_eq!(stored, saved);
    }
}
