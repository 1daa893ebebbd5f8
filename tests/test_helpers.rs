// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库 / 固定时钟 AppState / 测试数据构造
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use precast_aps::app::AppState;
use precast_aps::domain::{
    PieceEnvelope, PieceRequest, Priority, Resource, UrgencyDirective, WorkOrder, WorkOrderStatus,
};
use precast_aps::engine::FixedClock;
use std::error::Error;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 创建临时测试数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();
    Ok((temp_file, db_path))
}

/// 2026-01-05 (周一) 指定时刻
pub fn monday(hour: u32, minute: u32) -> NaiveDateTime {
    at(5, hour, minute)
}

/// 2026-01-<day> 指定时刻
pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// 创建固定时钟 (周一 07:00) 的 AppState
pub fn create_test_state() -> (NamedTempFile, AppState) {
    create_test_state_at(monday(7, 0))
}

pub fn create_test_state_at(now: NaiveDateTime) -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::with_clock(db_path, Arc::new(FixedClock(now))).unwrap();
    (temp_file, state)
}

// ==========================================
// 测试数据构造
// ==========================================

pub fn mold(id: &str, length_cm: f64, capacity: u32, setup_minutes: i64) -> Resource {
    Resource {
        resource_id: id.to_string(),
        code: format!("FRM-{}", id),
        name: format!("Mold {}", id),
        max_height_cm: 60.0,
        max_width_cm: 40.0,
        max_length_cm: length_cm,
        declared_capacity: capacity,
        setup_minutes,
        available: true,
    }
}

pub fn work_order(id: &str, priority: Priority) -> WorkOrder {
    WorkOrder {
        work_order_id: id.to_string(),
        code: id.to_string(),
        name: format!("Work order {}", id),
        priority,
        urgency: UrgencyDirective::Normal,
        urgency_marked_at: None,
        deadline: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        status: WorkOrderStatus::Active,
    }
}

pub fn piece_request(
    id: &str,
    work_order_id: &str,
    envelope: PieceEnvelope,
    quantity: u32,
    unit_time_minutes: i64,
) -> PieceRequest {
    PieceRequest {
        request_id: id.to_string(),
        work_order_id: work_order_id.to_string(),
        envelope,
        quantity,
        unit_time_minutes,
        priority: Priority::Medium,
        pinned_resource_id: None,
    }
}

/// 基础场景
///
/// - M-A: 长 400, 容量 4, 换型 30
/// - M-B: 长 1000, 容量 2, 换型 60
/// - WO-1 (High): R-1 50x30x100 × 6, 20 分钟/件 → M-A 两批 (4 + 2)
/// - WO-2 (Medium): R-2 40x40x200 × 2, 60 分钟/件 → M-A 一批,需换型
///
/// 周一 07:00 起排,M-A 链:
/// R-1#1 07:00-08:20, R-1#2 08:20-09:00, (换型 30) R-2#1 09:30-11:30
pub fn seed_basic_scenario(state: &AppState) {
    state.resource_repo.upsert(&mold("M-A", 400.0, 4, 30)).unwrap();
    state.resource_repo.upsert(&mold("M-B", 1000.0, 2, 60)).unwrap();

    state
        .work_order_repo
        .insert(&work_order("WO-1", Priority::High))
        .unwrap();
    state
        .work_order_repo
        .insert(&work_order("WO-2", Priority::Medium))
        .unwrap();

    state
        .piece_request_repo
        .insert(&piece_request(
            "R-1",
            "WO-1",
            PieceEnvelope::new(50.0, 30.0, 100.0),
            6,
            20,
        ))
        .unwrap();
    state
        .piece_request_repo
        .insert(&piece_request(
            "R-2",
            "WO-2",
            PieceEnvelope::new(40.0, 40.0, 200.0),
            2,
            60,
        ))
        .unwrap();
}
