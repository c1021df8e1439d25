// ==========================================
// 履约中心人力分配系统 - 分配结果仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 语义: 按 run_id 整体替换 (同一 run 重复保存不产生重复行)
// ==========================================

use crate::domain::assignment::{Assignment, AssignmentPlan};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// AssignmentRepository - 分配结果仓储
// ==========================================
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存分配方案（事务化,按 run_id 替换）
    ///
    /// # 返回
    /// - Ok(usize): 写入行数
    pub fn save_plan(&self, plan: &AssignmentPlan) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute("DELETE FROM assignment WHERE run_id = ?1", params![plan.run_id])?;

        let created_at = plan.created_at.to_rfc3339();
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO assignment (
                    run_id, order_id, class_id, processing_minutes, cost, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for a in &plan.assignments {
                stmt.execute(params![
                    plan.run_id,
                    a.order_id,
                    a.class_id,
                    a.processing_minutes,
                    a.cost,
                    created_at,
                ])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    /// 查询指定运行的分配列表 (按订单号数值升序)
    pub fn list_by_run(&self, run_id: &str) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, class_id, processing_minutes, cost
            FROM assignment
            WHERE run_id = ?1
            ORDER BY CAST(order_id AS INTEGER), order_id
            "#,
        )?;

        let assignments = stmt
            .query_map(params![run_id], |row| {
                Ok(Assignment {
                    order_id: row.get(0)?,
                    class_id: row.get(1)?,
                    processing_minutes: row.get(2)?,
                    cost: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<Assignment>>>()?;

        Ok(assignments)
    }

    /// 最近一次保存的 run_id
    pub fn latest_run_id(&self) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let run_id = conn
            .query_row(
                r#"
                SELECT run_id FROM assignment
                GROUP BY run_id
                ORDER BY MAX(created_at) DESC, MAX(rowid) DESC
                LIMIT 1
                "#,
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use chrono::Utc;

    fn repo() -> AssignmentRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        AssignmentRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn plan(run_id: &str, ids: &[&str]) -> AssignmentPlan {
        AssignmentPlan {
            run_id: run_id.to_string(),
            assignments: ids
                .iter()
                .map(|id| Assignment {
                    order_id: id.to_string(),
                    class_id: "Robot".to_string(),
                    processing_minutes: 2.0,
                    cost: 2.0 * 5.0 / 60.0,
                })
                .collect(),
            total_cost: 0.0,
            class_usage: Vec::new(),
            solve_duration_ms: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_replaces_same_run() {
        let repo = repo();
        repo.save_plan(&plan("R1", &["1", "2", "3"])).unwrap();
        repo.save_plan(&plan("R1", &["10", "2"])).unwrap();

        let stored = repo.list_by_run("R1").unwrap();
        let ids: Vec<&str> = stored.iter().map(|a| a.order_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "10"]);
    }

    #[test]
    fn test_runs_are_isolated() {
        let repo = repo();
        repo.save_plan(&plan("R1", &["1"])).unwrap();
        repo.save_plan(&plan("R2", &["1", "2"])).unwrap();

        assert_eq!(repo.list_by_run("R1").unwrap().len(), 1);
        assert_eq!(repo.list_by_run("R2").unwrap().len(), 2);
        assert_eq!(repo.latest_run_id().unwrap().as_deref(), Some("R2"));
    }

    #[test]
    fn test_latest_run_empty() {
        assert_eq!(repo().latest_run_id().unwrap(), None);
    }
}
