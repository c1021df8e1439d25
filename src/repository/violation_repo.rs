// ==========================================
// 履约中心人力分配系统 - 违规记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 语义: 按 run_id 整体替换
// ==========================================

use crate::domain::types::Severity;
use crate::domain::violation::ViolationRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct ViolationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ViolationRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存一次运行的违规记录（事务化,按 run_id 替换）
    pub fn save_for_run(&self, run_id: &str, violations: &[ViolationRecord]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute("DELETE FROM violation_record WHERE run_id = ?1", params![run_id])?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO violation_record (
                    run_id, order_id, class_id, rule_name, observed_value, threshold, severity
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for v in violations {
                stmt.execute(params![
                    run_id,
                    v.order_id,
                    v.class_id,
                    v.rule_name,
                    v.observed_value,
                    v.threshold,
                    v.severity.to_string(),
                ])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    /// 查询指定运行的违规记录 (按订单号、规则名排序)
    pub fn list_by_run(&self, run_id: &str) -> RepositoryResult<Vec<ViolationRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, class_id, rule_name, observed_value, threshold, severity
            FROM violation_record
            WHERE run_id = ?1
            ORDER BY order_id, rule_name
            "#,
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut violations = Vec::new();
        for row in rows {
            let (order_id, class_id, rule_name, observed_value, threshold, severity_raw) = row?;
            let severity = severity_raw
                .parse::<Severity>()
                .map_err(|message| RepositoryError::FieldValueError {
                    field: "severity".to_string(),
                    message,
                })?;
            violations.push(ViolationRecord {
                order_id,
                class_id,
                rule_name,
                observed_value,
                threshold,
                severity,
            });
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn violation(order_id: &str, rule_name: &str) -> ViolationRecord {
        ViolationRecord {
            order_id: order_id.to_string(),
            class_id: "Robot".to_string(),
            rule_name: rule_name.to_string(),
            observed_value: 25.0,
            threshold: 5.0,
            severity: Severity::Critical,
        }
    }

    #[test]
    fn test_save_and_list() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = ViolationRepository::from_connection(Arc::new(Mutex::new(conn)));

        repo.save_for_run("R1", &[violation("7", "weight_limit"), violation("7", "item_count_limit")])
            .unwrap();
        repo.save_for_run("R1", &[violation("7", "weight_limit")]).unwrap();

        let stored = repo.list_by_run("R1").unwrap();
        assert_eq!(stored, vec![violation("7", "weight_limit")]);
        assert!(repo.list_by_run("R2").unwrap().is_empty());
    }
}
