// Dev utility: reset the database and seed a small precast factory scenario,
// then run one reschedule so `precast-aps schedule` has something to show.
//
// Usage:
//   cargo run --bin seed_demo_scenario -- [db_path]

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use precast_aps::api::DEFAULT_ACTOR;
use precast_aps::app::{get_default_db_path, AppState};
use precast_aps::config::config_keys;
use precast_aps::domain::{
    CalendarDay, PieceEnvelope, PieceRequest, Priority, Resource, UrgencyDirective, WorkOrder,
    WorkOrderStatus,
};
use std::error::Error;
use std::fs;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    precast_aps::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;
    let today = Local::now().date_naive();

    seed_config(&state)?;
    seed_resources(&state)?;
    seed_work_orders(&state, today)?;
    seed_calendar(&state, today)?;

    let result = state.schedule_api.reschedule(DEFAULT_ACTOR)?;
    eprintln!(
        "Seeded {}: revision={} batches={} skipped={}",
        db_path,
        result.revision,
        result.batch_count,
        result.skipped.len()
    );
    for item in &result.skipped {
        eprintln!("  skipped {} [{}] {}", item.subject_id, item.code, item.reason);
    }
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_config(state: &AppState) -> Result<(), Box<dyn Error>> {
    let cfg = &state.config_manager;
    cfg.set_global_config_value(config_keys::SHIFT_START, "07:00")?;
    cfg.set_global_config_value(config_keys::SHIFT_END, "17:00")?;
    cfg.set_global_config_value(config_keys::WEEKEND_DAYS, "6,7")?;
    Ok(())
}

fn seed_resources(state: &AppState) -> Result<(), Box<dyn Error>> {
    // (id, code, name, h, w, l, capacity, setup, available)
    let molds = [
        ("M-BEAM-01", "FRM-B01", "Beam mold 01", 60.0, 40.0, 1200.0, 4, 45, true),
        ("M-BEAM-02", "FRM-B02", "Beam mold 02", 60.0, 40.0, 900.0, 3, 45, true),
        ("M-SLAB-01", "FRM-S01", "Slab table 01", 30.0, 250.0, 600.0, 2, 30, true),
        ("M-COL-01", "FRM-C01", "Column mold 01", 50.0, 50.0, 400.0, 8, 20, true),
        ("M-COL-02", "FRM-C02", "Column mold 02", 50.0, 50.0, 400.0, 8, 20, false),
    ];

    for (id, code, name, h, w, l, cap, setup, available) in molds {
        state.resource_repo.upsert(&Resource {
            resource_id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            max_height_cm: h,
            max_width_cm: w,
            max_length_cm: l,
            declared_capacity: cap,
            setup_minutes: setup,
            available,
        })?;
    }
    Ok(())
}

fn seed_work_orders(state: &AppState, today: NaiveDate) -> Result<(), Box<dyn Error>> {
    let marked_at = Local::now().naive_local();

    let orders = [
        ("WO-001", "Riverside block A", Priority::High, UrgencyDirective::Normal, 14, WorkOrderStatus::Active),
        ("WO-002", "Hospital annex", Priority::Critical, UrgencyDirective::PassToFront, 10, WorkOrderStatus::Active),
        ("WO-003", "Parking deck", Priority::Medium, UrgencyDirective::InsertAfterResource("M-BEAM-01".to_string()), 21, WorkOrderStatus::Active),
        ("WO-004", "Warehouse slabs", Priority::Low, UrgencyDirective::SendToBack, 30, WorkOrderStatus::Active),
        ("WO-005", "School wing (on hold)", Priority::High, UrgencyDirective::Normal, 7, WorkOrderStatus::Paused),
    ];

    for (id, name, priority, urgency, deadline_days, status) in orders {
        let urgency_marked_at = (!matches!(urgency, UrgencyDirective::Normal)).then_some(marked_at);
        state.work_order_repo.insert(&WorkOrder {
            work_order_id: id.to_string(),
            code: id.to_string(),
            name: name.to_string(),
            priority,
            urgency,
            urgency_marked_at,
            deadline: today + Duration::days(deadline_days),
            status,
        })?;
    }

    // (request, work order, h, w, l, qty, unit minutes, priority, pinned)
    let requests = [
        ("REQ-001", "WO-001", 50.0, 30.0, 300.0, 10, 45, Priority::High, None),
        ("REQ-002", "WO-001", 45.0, 30.0, 200.0, 6, 40, Priority::Medium, None),
        ("REQ-003", "WO-002", 40.0, 40.0, 350.0, 12, 30, Priority::Critical, None),
        ("REQ-004", "WO-003", 55.0, 35.0, 450.0, 8, 50, Priority::Medium, Some("M-BEAM-02")),
        ("REQ-005", "WO-004", 20.0, 240.0, 300.0, 6, 60, Priority::Low, None),
        ("REQ-006", "WO-004", 80.0, 80.0, 300.0, 2, 60, Priority::Low, None),
        ("REQ-007", "WO-005", 50.0, 30.0, 300.0, 4, 45, Priority::High, None),
    ];

    for (id, wo, h, w, l, qty, unit, priority, pinned) in requests {
        state.piece_request_repo.insert(&PieceRequest {
            request_id: id.to_string(),
            work_order_id: wo.to_string(),
            envelope: PieceEnvelope::new(h, w, l),
            quantity: qty,
            unit_time_minutes: unit,
            priority,
            pinned_resource_id: pinned.map(str::to_string),
        })?;
    }
    Ok(())
}

fn seed_calendar(state: &AppState, today: NaiveDate) -> Result<(), Box<dyn Error>> {
    // 下一个周三放假,下一个周四短班
    let mut day = today + Duration::days(1);
    while day.weekday() != Weekday::Wed {
        day += Duration::days(1);
    }
    state
        .calendar_repo
        .upsert(&CalendarDay::holiday(day, "Plant maintenance"))?;

    let short_day = day + Duration::days(1);
    if let (Some(start), Some(end)) = (
        chrono::NaiveTime::from_hms_opt(9, 0, 0),
        chrono::NaiveTime::from_hms_opt(13, 0, 0),
    ) {
        state
            .calendar_repo
            .upsert(&CalendarDay::shift(short_day, start, end))?;
    }
    Ok(())
}
