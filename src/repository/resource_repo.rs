// ==========================================
// 预制构件模具排产系统 - 模具数据仓储
// ==========================================
// 对齐: resource 表
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::resource::Resource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT resource_id, code, name, max_height_cm, max_width_cm, max_length_cm,
           declared_capacity, setup_minutes, available
    FROM resource
"#;

// ==========================================
// ResourceRepository - 模具仓储
// ==========================================
pub struct ResourceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ResourceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或覆盖模具
    pub fn upsert(&self, resource: &Resource) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO resource (
                resource_id, code, name, max_height_cm, max_width_cm, max_length_cm,
                declared_capacity, setup_minutes, available
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(resource_id) DO UPDATE SET
                code = excluded.code,
                name = excluded.name,
                max_height_cm = excluded.max_height_cm,
                max_width_cm = excluded.max_width_cm,
                max_length_cm = excluded.max_length_cm,
                declared_capacity = excluded.declared_capacity,
                setup_minutes = excluded.setup_minutes,
                available = excluded.available
            "#,
            params![
                resource.resource_id,
                resource.code,
                resource.name,
                resource.max_height_cm,
                resource.max_width_cm,
                resource.max_length_cm,
                resource.declared_capacity,
                resource.setup_minutes,
                resource.available,
            ],
        )?;
        Ok(())
    }

    /// 设置可用标记
    pub fn set_available(&self, resource_id: &str, available: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE resource SET available = ?1 WHERE resource_id = ?2",
            params![available, resource_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Resource".to_string(),
                id: resource_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn find_by_id(&self, resource_id: &str) -> RepositoryResult<Option<Resource>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE resource_id = ?1", SELECT_COLUMNS);
        let resource = conn
            .query_row(&sql, params![resource_id], map_row)
            .optional()?;
        Ok(resource)
    }

    /// 全部模具 (含不可用, 按 resource_id 排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Resource>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY resource_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let resources = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(resources)
    }
}

fn map_row(row: &Row<'_>) -> SqliteResult<Resource> {
    Ok(Resource {
        resource_id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        max_height_cm: row.get(3)?,
        max_width_cm: row.get(4)?,
        max_length_cm: row.get(5)?,
        declared_capacity: row.get(6)?,
        setup_minutes: row.get(7)?,
        available: row.get(8)?,
    })
}
