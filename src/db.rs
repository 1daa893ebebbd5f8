// ==========================================
// 预制构件模具排产系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键 / busy_timeout)
// - 幂等建表: 首次打开空库即可使用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;
use tracing::{debug, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建表语句 (全部 IF NOT EXISTS,可重复执行)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS resource (
    resource_id       TEXT PRIMARY KEY,
    code              TEXT NOT NULL UNIQUE,
    name              TEXT NOT NULL,
    max_height_cm     REAL NOT NULL,
    max_width_cm      REAL NOT NULL,
    max_length_cm     REAL NOT NULL,
    declared_capacity INTEGER NOT NULL CHECK (declared_capacity >= 0),
    setup_minutes     INTEGER NOT NULL DEFAULT 0 CHECK (setup_minutes >= 0),
    available         INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS work_order (
    work_order_id     TEXT PRIMARY KEY,
    code              TEXT NOT NULL,
    name              TEXT NOT NULL,
    priority          TEXT NOT NULL DEFAULT 'medium',
    urgency           TEXT NOT NULL DEFAULT 'normal',
    urgency_marked_at TEXT,
    deadline          TEXT NOT NULL,
    status            TEXT NOT NULL DEFAULT 'ACTIVE'
);

CREATE TABLE IF NOT EXISTS piece_request (
    request_id         TEXT PRIMARY KEY,
    work_order_id      TEXT NOT NULL REFERENCES work_order(work_order_id) ON DELETE CASCADE,
    height_cm          REAL NOT NULL,
    width_cm           REAL NOT NULL,
    length_cm          REAL NOT NULL,
    quantity           INTEGER NOT NULL,
    unit_time_minutes  INTEGER NOT NULL,
    priority           TEXT NOT NULL DEFAULT 'medium',
    pinned_resource_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_piece_request_work_order ON piece_request(work_order_id);

CREATE TABLE IF NOT EXISTS batch (
    batch_id          TEXT PRIMARY KEY,
    request_id        TEXT NOT NULL,
    work_order_id     TEXT NOT NULL,
    resource_id       TEXT NOT NULL,
    group_height_mm   INTEGER NOT NULL,
    group_width_mm    INTEGER NOT NULL,
    quantity          INTEGER NOT NULL CHECK (quantity > 0),
    unit_time_minutes INTEGER NOT NULL,
    split_index       INTEGER NOT NULL,
    start_at          TEXT NOT NULL,
    end_at            TEXT NOT NULL,
    setup_applied     INTEGER NOT NULL DEFAULT 0,
    delay_minutes     INTEGER NOT NULL DEFAULT 0,
    sequence_no       INTEGER NOT NULL,
    predecessor_id    TEXT,
    queue_position    INTEGER NOT NULL,
    status            TEXT NOT NULL DEFAULT 'SCHEDULED',
    UNIQUE (resource_id, sequence_no)
);

CREATE TABLE IF NOT EXISTS work_calendar (
    calendar_date TEXT PRIMARY KEY,
    is_holiday    INTEGER NOT NULL DEFAULT 0,
    holiday_name  TEXT,
    shift_start   TEXT,
    shift_end     TEXT
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id   TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS schedule_meta (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    revision    INTEGER NOT NULL DEFAULT 0,
    last_run_id TEXT,
    updated_at  TEXT
);
INSERT OR IGNORE INTO schedule_meta (id, revision) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS action_log (
    action_id         TEXT PRIMARY KEY,
    action_type       TEXT NOT NULL,
    action_ts         TEXT NOT NULL,
    actor             TEXT NOT NULL,
    schedule_revision INTEGER NOT NULL,
    payload_json      TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 幂等建表并记录 schema_version
pub fn bootstrap_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    match read_schema_version(conn)? {
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            warn!(
                db_version = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema 版本高于当前程序,可能存在不兼容字段"
            );
        }
        v => debug!(schema_version = ?v, "schema 初始化完成"),
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        bootstrap_schema(&conn).unwrap();
        bootstrap_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        let revision: i64 = conn
            .query_row("SELECT revision FROM schedule_meta WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(revision, 0);
    }

    #[test]
    fn test_schema_version_missing_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
