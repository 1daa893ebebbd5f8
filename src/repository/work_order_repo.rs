// ==========================================
// 预制构件模具排产系统 - 工单 / 构件需求数据仓储
// ==========================================
// 对齐: work_order / piece_request 表
// 边界: 紧急指令/优先级/状态在此解析为领域枚举
// ==========================================

use crate::domain::types::{UrgencyDirective, WorkOrderStatus};
use crate::domain::work_order::{PieceEnvelope, PieceRequest, WorkOrder};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{fmt_date, fmt_ts, parse_date, parse_enum, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// WorkOrderRepository - 工单仓储
// ==========================================
pub struct WorkOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkOrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, work_order: &WorkOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO work_order (
                work_order_id, code, name, priority, urgency,
                urgency_marked_at, deadline, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                work_order.work_order_id,
                work_order.code,
                work_order.name,
                work_order.priority.to_string(),
                work_order.urgency.to_string(),
                work_order.urgency_marked_at.as_ref().map(fmt_ts),
                fmt_date(&work_order.deadline),
                work_order.status.to_string(),
            ],
        )?;
        Ok(())
    }

    /// 设置紧急指令并记录标记时间
    pub fn set_urgency(
        &self,
        work_order_id: &str,
        urgency: &UrgencyDirective,
        marked_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE work_order SET urgency = ?1, urgency_marked_at = ?2 WHERE work_order_id = ?3",
            params![urgency.to_string(), fmt_ts(&marked_at), work_order_id],
        )?;
        ensure_found(rows, "WorkOrder", work_order_id)
    }

    pub fn set_status(&self, work_order_id: &str, status: WorkOrderStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE work_order SET status = ?1 WHERE work_order_id = ?2",
            params![status.to_string(), work_order_id],
        )?;
        ensure_found(rows, "WorkOrder", work_order_id)
    }

    pub fn find_by_id(&self, work_order_id: &str) -> RepositoryResult<Option<WorkOrder>> {
        let conn = self.get_conn()?;
        let work_order = conn
            .query_row(
                r#"
                SELECT work_order_id, code, name, priority, urgency,
                       urgency_marked_at, deadline, status
                FROM work_order
                WHERE work_order_id = ?1
                "#,
                params![work_order_id],
                map_work_order,
            )
            .optional()?;
        Ok(work_order)
    }

    /// 全部工单 (按 work_order_id 排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<WorkOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT work_order_id, code, name, priority, urgency,
                   urgency_marked_at, deadline, status
            FROM work_order
            ORDER BY work_order_id
            "#,
        )?;
        let work_orders = stmt
            .query_map([], map_work_order)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(work_orders)
    }
}

// ==========================================
// PieceRequestRepository - 构件需求仓储
// ==========================================
pub struct PieceRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PieceRequestRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, request: &PieceRequest) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO piece_request (
                request_id, work_order_id, height_cm, width_cm, length_cm,
                quantity, unit_time_minutes, priority, pinned_resource_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                request.request_id,
                request.work_order_id,
                request.envelope.height_cm,
                request.envelope.width_cm,
                request.envelope.length_cm,
                request.quantity,
                request.unit_time_minutes,
                request.priority.to_string(),
                request.pinned_resource_id,
            ],
        )?;
        Ok(())
    }

    /// 全部需求 (按 request_id 排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<PieceRequest>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT request_id, work_order_id, height_cm, width_cm, length_cm,
                   quantity, unit_time_minutes, priority, pinned_resource_id
            FROM piece_request
            ORDER BY request_id
            "#,
        )?;
        let requests = stmt
            .query_map([], map_piece_request)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(requests)
    }

    pub fn list_by_work_order(&self, work_order_id: &str) -> RepositoryResult<Vec<PieceRequest>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT request_id, work_order_id, height_cm, width_cm, length_cm,
                   quantity, unit_time_minutes, priority, pinned_resource_id
            FROM piece_request
            WHERE work_order_id = ?1
            ORDER BY request_id
            "#,
        )?;
        let requests = stmt
            .query_map(params![work_order_id], map_piece_request)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(requests)
    }
}

fn ensure_found(rows: usize, entity: &str, id: &str) -> RepositoryResult<()> {
    if rows == 0 {
        return Err(RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn map_work_order(row: &Row<'_>) -> SqliteResult<WorkOrder> {
    let priority: String = row.get(3)?;
    let urgency: String = row.get(4)?;
    let marked_at: Option<String> = row.get(5)?;
    let deadline: String = row.get(6)?;
    let status: String = row.get(7)?;

    Ok(WorkOrder {
        work_order_id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        priority: parse_enum(3, &priority)?,
        urgency: parse_enum(4, &urgency)?,
        urgency_marked_at: marked_at.as_deref().map(|s| parse_ts(5, s)).transpose()?,
        deadline: parse_date(6, &deadline)?,
        status: parse_enum(7, &status)?,
    })
}

fn map_piece_request(row: &Row<'_>) -> SqliteResult<PieceRequest> {
    let priority: String = row.get(7)?;
    // 外部写入的非正/越界数量按 0 读出,由装箱校验记为 INVALID_PIECE_REQUEST
    let quantity: i64 = row.get(5)?;
    Ok(PieceRequest {
        request_id: row.get(0)?,
        work_order_id: row.get(1)?,
        envelope: PieceEnvelope::new(row.get(2)?, row.get(3)?, row.get(4)?),
        quantity: u32::try_from(quantity).unwrap_or(0),
        unit_time_minutes: row.get(6)?,
        priority: parse_enum(7, &priority)?,
        pinned_resource_id: row.get(8)?,
    })
}
