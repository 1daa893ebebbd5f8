// ==========================================
// 预制构件模具排产系统 - 工作日历数据仓储
// ==========================================
// 对齐: work_calendar 表 (按日期覆写班次 / 节假日)
// ==========================================

use crate::domain::calendar::CalendarDay;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{fmt_date, fmt_time, parse_date, parse_time};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct CalendarRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CalendarRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或覆盖某日设置
    pub fn upsert(&self, day: &CalendarDay) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO work_calendar (calendar_date, is_holiday, holiday_name, shift_start, shift_end)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(calendar_date) DO UPDATE SET
                is_holiday = excluded.is_holiday,
                holiday_name = excluded.holiday_name,
                shift_start = excluded.shift_start,
                shift_end = excluded.shift_end
            "#,
            params![
                fmt_date(&day.date),
                day.is_holiday,
                day.holiday_name,
                day.shift_start.as_ref().map(fmt_time),
                day.shift_end.as_ref().map(fmt_time),
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, date: NaiveDate) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM work_calendar WHERE calendar_date = ?1",
            params![fmt_date(&date)],
        )?;
        Ok(rows > 0)
    }

    /// 全部覆写 (按日期升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<CalendarDay>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT calendar_date, is_holiday, holiday_name, shift_start, shift_end
            FROM work_calendar
            ORDER BY calendar_date
            "#,
        )?;
        let days = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(days)
    }
}

fn map_row(row: &Row<'_>) -> SqliteResult<CalendarDay> {
    let date: String = row.get(0)?;
    let shift_start: Option<String> = row.get(3)?;
    let shift_end: Option<String> = row.get(4)?;

    Ok(CalendarDay {
        date: parse_date(0, &date)?,
        is_holiday: row.get(1)?,
        holiday_name: row.get(2)?,
        shift_start: shift_start.as_deref().map(|s| parse_time(3, s)).transpose()?,
        shift_end: shift_end.as_deref().map(|s| parse_time(4, s)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn setup() -> CalendarRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::bootstrap_schema(&conn).unwrap();
        CalendarRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_upsert_and_list() {
        let repo = setup();
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();

        repo.upsert(&CalendarDay::shift(
            d2,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        ))
        .unwrap();
        repo.upsert(&CalendarDay::holiday(d1, "Dia de Reis")).unwrap();

        let days = repo.list_all().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0], CalendarDay::holiday(d1, "Dia de Reis"));
        assert_eq!(days[1].shift_end, NaiveTime::from_hms_opt(12, 0, 0));

        // 覆盖同日期
        repo.upsert(&CalendarDay::holiday(d2, "Ponte")).unwrap();
        assert_eq!(repo.list_all().unwrap().len(), 2);
        assert!(repo.delete(d2).unwrap());
        assert!(!repo.delete(d2).unwrap());
    }
}
