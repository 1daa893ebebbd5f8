// ==========================================
// 预制构件模具排产系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接与 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::ScheduleApi;
use crate::config::ConfigManager;
use crate::db::{bootstrap_schema, open_sqlite_connection};
use crate::engine::clock::{Clock, SystemClock};
use crate::repository::{
    ActionLogRepository, BatchRepository, CalendarRepository, PieceRequestRepository,
    ResourceRepository, WorkOrderRepository,
};

/// 应用状态
///
/// 所有仓储共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 排程API
    pub schedule_api: Arc<ScheduleApi>,

    /// 模具仓储（目录维护）
    pub resource_repo: Arc<ResourceRepository>,

    /// 工单仓储（紧急指令 / 状态维护）
    pub work_order_repo: Arc<WorkOrderRepository>,

    /// 构件需求仓储
    pub piece_request_repo: Arc<PieceRequestRepository>,

    /// 日历覆写仓储
    pub calendar_repo: Arc<CalendarRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例 (系统时钟)
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    /// 创建新的AppState实例 (指定时钟, 测试/回放用)
    ///
    /// # 说明
    /// 1. 打开连接并统一 PRAGMA
    /// 2. 初始化 schema (幂等)
    /// 3. 初始化所有Repository与API
    pub fn with_clock(db_path: String, clock: Arc<dyn Clock>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        bootstrap_schema(&conn).map_err(|e| format!("无法初始化数据库schema: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let resource_repo = Arc::new(ResourceRepository::new(conn.clone()));
        let work_order_repo = Arc::new(WorkOrderRepository::new(conn.clone()));
        let piece_request_repo = Arc::new(PieceRequestRepository::new(conn.clone()));
        let batch_repo = Arc::new(BatchRepository::new(conn.clone()));
        let calendar_repo = Arc::new(CalendarRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let schedule_api = Arc::new(ScheduleApi::new(
            resource_repo.clone(),
            work_order_repo.clone(),
            piece_request_repo.clone(),
            batch_repo,
            calendar_repo.clone(),
            action_log_repo,
            config_manager.clone(),
            clock,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            schedule_api,
            resource_repo,
            work_order_repo,
            piece_request_repo,
            calendar_repo,
            config_manager,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 PRECAST_APS_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./precast_aps.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("precast-aps");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("precast_aps.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "PRECAST_APS_DB_PATH";

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_app_state_bootstraps_fresh_db() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert!(state.schedule_api.get_schedule().unwrap().is_empty());
        assert!(state.resource_repo.list_all().unwrap().is_empty());
    }
}
