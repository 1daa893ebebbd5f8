// ==========================================
// 预制构件模具排产系统 - 批次数据仓储
// ==========================================
// 对齐: batch 表 + schedule_meta 表 (排程版本号)
// ==========================================
// 并发控制:
// - 每次排程写入 revision + 1
// - 写入前比对 expected_revision,不一致 → OptimisticLockFailure,不写任何数据
// - 写入 + 版本号 + 操作日志在同一个 IMMEDIATE 事务内提交
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::domain::batch::Batch;
use crate::domain::work_order::PieceGroup;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{fmt_ts, parse_enum, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{
    params, Connection, OptionalExtension, Result as SqliteResult, Row, TransactionBehavior,
};
use std::sync::{Arc, Mutex};
use tracing::debug;

const SELECT_COLUMNS: &str = r#"
    SELECT batch_id, request_id, work_order_id, resource_id,
           group_height_mm, group_width_mm, quantity, unit_time_minutes, split_index,
           start_at, end_at, setup_applied, delay_minutes,
           sequence_no, predecessor_id, queue_position, status
    FROM batch
"#;

// ==========================================
// BatchRepository - 批次仓储
// ==========================================
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 全部已提交批次 (按模具 → FS 链序号)
    pub fn list_all(&self) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY resource_id, sequence_no", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    /// 某模具的 FS 链
    pub fn list_by_resource(&self, resource_id: &str) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE resource_id = ?1 ORDER BY sequence_no", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(params![resource_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE batch_id = ?1", SELECT_COLUMNS);
        let batch = conn
            .query_row(&sql, params![batch_id], map_row)
            .optional()?;
        Ok(batch)
    }

    /// 当前排程版本号
    pub fn current_revision(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        read_revision(&conn)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 整体替换已提交批次集合 (删除全部 → 插入新集合)
    ///
    /// # 返回
    /// - Ok(new_revision)
    /// - Err(OptimisticLockFailure): 版本号已被其他写入推进
    pub fn replace_all(
        &self,
        batches: &[Batch],
        expected_revision: i64,
        run_id: &str,
        now: NaiveDateTime,
        mut log: ActionLog,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let actual = read_revision(&tx)?;
        if actual != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                expected: expected_revision,
                actual,
            });
        }

        let deleted = tx.execute("DELETE FROM batch", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO batch (
                    batch_id, request_id, work_order_id, resource_id,
                    group_height_mm, group_width_mm, quantity, unit_time_minutes, split_index,
                    start_at, end_at, setup_applied, delay_minutes,
                    sequence_no, predecessor_id, queue_position, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                "#,
            )?;
            for b in batches {
                stmt.execute(params![
                    b.batch_id,
                    b.request_id,
                    b.work_order_id,
                    b.resource_id,
                    b.group.height_mm,
                    b.group.width_mm,
                    b.quantity,
                    b.unit_time_minutes,
                    b.split_index,
                    fmt_ts(&b.start),
                    fmt_ts(&b.end),
                    b.setup_applied,
                    b.delay_minutes,
                    b.sequence_no,
                    b.predecessor_id,
                    b.queue_position,
                    b.status.to_string(),
                ])?;
            }
        }

        let new_revision = bump_revision(&tx, actual, Some(run_id), now)?;
        log.schedule_revision = new_revision;
        ActionLogRepository::insert_on(&tx, &log)?;
        tx.commit()?;

        debug!(
            deleted,
            inserted = batches.len(),
            revision = new_revision,
            "批次集合已替换"
        );
        Ok(new_revision)
    }

    /// 更新已有批次的时间窗 / 延误 / 状态 (延误传播结果)
    ///
    /// # 返回
    /// - Ok(new_revision)
    /// - Err(NotFound): 某个批次已不存在 (整体回滚)
    pub fn update_timings(
        &self,
        batches: &[Batch],
        expected_revision: i64,
        now: NaiveDateTime,
        mut log: ActionLog,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let actual = read_revision(&tx)?;
        if actual != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                expected: expected_revision,
                actual,
            });
        }

        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE batch
                SET start_at = ?1, end_at = ?2, delay_minutes = ?3, status = ?4
                WHERE batch_id = ?5
                "#,
            )?;
            for b in batches {
                let rows = stmt.execute(params![
                    fmt_ts(&b.start),
                    fmt_ts(&b.end),
                    b.delay_minutes,
                    b.status.to_string(),
                    b.batch_id,
                ])?;
                if rows == 0 {
                    return Err(RepositoryError::NotFound {
                        entity: "Batch".to_string(),
                        id: b.batch_id.clone(),
                    });
                }
            }
        }

        let new_revision = bump_revision(&tx, actual, None, now)?;
        log.schedule_revision = new_revision;
        ActionLogRepository::insert_on(&tx, &log)?;
        tx.commit()?;
        Ok(new_revision)
    }
}

// ==========================================
// schedule_meta 辅助
// ==========================================

fn read_revision(conn: &Connection) -> RepositoryResult<i64> {
    let revision: Option<i64> = conn
        .query_row("SELECT revision FROM schedule_meta WHERE id = 1", [], |row| row.get(0))
        .optional()?;
    Ok(revision.unwrap_or(0))
}

fn bump_revision(
    conn: &Connection,
    current: i64,
    run_id: Option<&str>,
    now: NaiveDateTime,
) -> RepositoryResult<i64> {
    let next = current + 1;
    conn.execute(
        r#"
        INSERT INTO schedule_meta (id, revision, last_run_id, updated_at)
        VALUES (1, ?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET
            revision = excluded.revision,
            last_run_id = COALESCE(excluded.last_run_id, schedule_meta.last_run_id),
            updated_at = excluded.updated_at
        "#,
        params![next, run_id, fmt_ts(&now)],
    )?;
    Ok(next)
}

fn map_row(row: &Row<'_>) -> SqliteResult<Batch> {
    let start: String = row.get(9)?;
    let end: String = row.get(10)?;
    let status: String = row.get(16)?;

    Ok(Batch {
        batch_id: row.get(0)?,
        request_id: row.get(1)?,
        work_order_id: row.get(2)?,
        resource_id: row.get(3)?,
        group: PieceGroup {
            height_mm: row.get(4)?,
            width_mm: row.get(5)?,
        },
        quantity: row.get(6)?,
        unit_time_minutes: row.get(7)?,
        split_index: row.get(8)?,
        start: parse_ts(9, &start)?,
        end: parse_ts(10, &end)?,
        setup_applied: row.get(11)?,
        delay_minutes: row.get(12)?,
        sequence_no: row.get(13)?,
        predecessor_id: row.get(14)?,
        queue_position: row.get(15)?,
        status: parse_enum(16, &status)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_log::ActionType;
    use crate::domain::types::BatchStatus;
    use chrono::NaiveDate;

    fn setup() -> (BatchRepository, ActionLogRepository) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::bootstrap_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        (
            BatchRepository::new(conn.clone()),
            ActionLogRepository::new(conn),
        )
    }

    fn dt(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn batch(id: &str, resource_id: &str, seq: u32) -> Batch {
        Batch {
            batch_id: id.to_string(),
            request_id: "R".to_string(),
            work_order_id: "WO".to_string(),
            resource_id: resource_id.to_string(),
            group: PieceGroup {
                height_mm: 200,
                width_mm: 300,
            },
            quantity: 2,
            unit_time_minutes: 30,
            split_index: seq,
            start: dt(6 + seq),
            end: dt(7 + seq),
            setup_applied: false,
            delay_minutes: 0,
            sequence_no: seq,
            predecessor_id: None,
            queue_position: seq,
            status: BatchStatus::Scheduled,
        }
    }

    fn log(action_type: ActionType) -> ActionLog {
        ActionLog {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type,
            action_ts: dt(6),
            actor: "test".to_string(),
            schedule_revision: 0,
            payload_json: None,
        }
    }

    #[test]
    fn test_replace_all_round_trip_and_revision() {
        let (repo, logs) = setup();
        let batches = vec![batch("N#1", "N", 1), batch("M#1", "M", 1), batch("M#2", "M", 2)];

        let rev = repo
            .replace_all(&batches, 0, "run-1", dt(6), log(ActionType::Reschedule))
            .unwrap();
        assert_eq!(rev, 1);
        assert_eq!(repo.current_revision().unwrap(), 1);

        let stored = repo.list_all().unwrap();
        let ids: Vec<&str> = stored.iter().map(|b| b.batch_id.as_str()).collect();
        assert_eq!(ids, vec!["M#1", "M#2", "N#1"]);
        assert_eq!(stored[0], batches[1]);

        let logged = logs.find_recent(1).unwrap();
        assert_eq!(logged[0].schedule_revision, 1);
    }

    #[test]
    fn test_replace_all_discards_previous_set() {
        let (repo, _) = setup();
        repo.replace_all(&[batch("OLD#1", "M", 1)], 0, "run-1", dt(6), log(ActionType::Reschedule))
            .unwrap();
        repo.replace_all(&[batch("NEW#1", "M", 1)], 1, "run-2", dt(6), log(ActionType::Reschedule))
            .unwrap();

        assert!(repo.find_by_id("OLD#1").unwrap().is_none());
        assert!(repo.find_by_id("NEW#1").unwrap().is_some());
    }

    #[test]
    fn test_stale_revision_commits_nothing() {
        let (repo, logs) = setup();
        repo.replace_all(&[batch("A#1", "M", 1)], 0, "run-1", dt(6), log(ActionType::Reschedule))
            .unwrap();

        let err = repo
            .replace_all(&[batch("B#1", "M", 1)], 0, "run-2", dt(6), log(ActionType::Reschedule))
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::OptimisticLockFailure {
                expected: 0,
                actual: 1
            }
        ));
        assert!(repo.find_by_id("A#1").unwrap().is_some());
        assert!(repo.find_by_id("B#1").unwrap().is_none());
        assert_eq!(logs.count().unwrap(), 1);
    }

    #[test]
    fn test_update_timings_missing_batch_rolls_back() {
        let (repo, _) = setup();
        repo.replace_all(&[batch("A#1", "M", 1)], 0, "run-1", dt(6), log(ActionType::Reschedule))
            .unwrap();

        let mut moved = batch("A#1", "M", 1);
        moved.start = dt(9);
        moved.end = dt(10);
        moved.delay_minutes = 120;
        moved.status = BatchStatus::Delayed;
        let ghost = batch("GHOST#1", "M", 2);

        let err = repo
            .update_timings(&[moved.clone(), ghost], 1, dt(6), log(ActionType::ApplyDelay))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert_eq!(repo.find_by_id("A#1").unwrap().unwrap().start, dt(7));
        assert_eq!(repo.current_revision().unwrap(), 1);

        let rev = repo
            .update_timings(&[moved.clone()], 1, dt(6), log(ActionType::ApplyDelay))
            .unwrap();
        assert_eq!(rev, 2);
        assert_eq!(repo.find_by_id("A#1").unwrap().unwrap(), moved);
    }
}
