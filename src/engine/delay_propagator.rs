// ==========================================
// 预制构件模具排产系统 - 延误传播引擎
// ==========================================
// 职责: 对单个批次施加人工延误,并沿该模具 FS 链向后级联
// 规则:
// - 目标批次及同模具 sequence_no >= 目标的批次整体平移 delay 分钟
// - 目标批次状态置为 DELAYED,受影响批次累计 delay_minutes
// - 纯平移,不重算换型
// 红线: 其他模具的批次不受影响
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::types::BatchStatus;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, Duration, NaiveDateTime};
use tracing::{info, instrument};

/// 平移后时刻的年份上限 (时刻以四位年份文本落库)
pub const MAX_SHIFTED_YEAR: i32 = 9999;

fn shift_instant(t: NaiveDateTime, shift: Duration) -> Option<NaiveDateTime> {
    t.checked_add_signed(shift)
        .filter(|shifted| shifted.year() <= MAX_SHIFTED_YEAR)
}

// ==========================================
// DelayOutcome - 延误结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct DelayOutcome {
    pub resource_id: String,
    /// 受影响批次ID (FS 链顺序,首个为目标批次)
    pub affected_batch_ids: Vec<String>,
}

// ==========================================
// DelayPropagator - 延误传播引擎
// ==========================================
pub struct DelayPropagator {
    // 无状态引擎，不需要注入依赖
}

impl DelayPropagator {
    pub fn new() -> Self {
        Self {}
    }

    /// 施加延误 (原地修改批次)
    ///
    /// # 参数
    /// - `batches`: 已提交批次(可以只包含目标模具的批次)
    /// - `batch_id`: 目标批次
    /// - `delay_minutes`: 延误分钟数 (> 0)
    ///
    /// # 返回
    /// - Err(InvalidDelay): delay_minutes <= 0,或平移后时间超出可表示范围
    /// - Err(BatchNotFound): 目标批次不存在
    #[instrument(skip(self, batches), fields(batches_count = batches.len()))]
    pub fn apply(
        &self,
        batches: &mut [Batch],
        batch_id: &str,
        delay_minutes: i64,
    ) -> EngineResult<DelayOutcome> {
        if delay_minutes <= 0 {
            return Err(EngineError::InvalidDelay { delay_minutes });
        }

        let (resource_id, target_seq) = batches
            .iter()
            .find(|b| b.batch_id == batch_id)
            .map(|b| (b.resource_id.clone(), b.sequence_no))
            .ok_or_else(|| EngineError::BatchNotFound {
                batch_id: batch_id.to_string(),
            })?;

        let invalid = || EngineError::InvalidDelay { delay_minutes };
        let shift = Duration::try_minutes(delay_minutes).ok_or_else(invalid)?;

        // 先算出全部新时间,任何一个溢出则整体拒绝,切片保持不变
        let mut shifted: Vec<(usize, NaiveDateTime, NaiveDateTime, i64)> = Vec::new();
        for (idx, batch) in batches.iter().enumerate() {
            if batch.resource_id != resource_id || batch.sequence_no < target_seq {
                continue;
            }
            let start = shift_instant(batch.start, shift).ok_or_else(invalid)?;
            let end = shift_instant(batch.end, shift).ok_or_else(invalid)?;
            let total = batch
                .delay_minutes
                .checked_add(delay_minutes)
                .ok_or_else(invalid)?;
            shifted.push((idx, start, end, total));
        }

        let mut affected: Vec<(u32, String)> = Vec::with_capacity(shifted.len());
        for (idx, start, end, total) in shifted {
            let batch = &mut batches[idx];
            batch.start = start;
            batch.end = end;
            batch.delay_minutes = total;
            if batch.batch_id == batch_id {
                batch.status = BatchStatus::Delayed;
            }
            affected.push((batch.sequence_no, batch.batch_id.clone()));
        }

        affected.sort();
        let affected_batch_ids: Vec<String> = affected.into_iter().map(|(_, id)| id).collect();

        info!(
            batch_id,
            resource_id = %resource_id,
            delay_minutes,
            affected = affected_batch_ids.len(),
            "延误已传播"
        );

        Ok(DelayOutcome {
            resource_id,
            affected_batch_ids,
        })
    }
}

impl Default for DelayPropagator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_order::PieceGroup;
    use chrono::NaiveDate;

    fn dt(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn batch(id: &str, resource_id: &str, seq: u32, start_h: u32) -> Batch {
        Batch {
            batch_id: id.to_string(),
            request_id: "R".to_string(),
            work_order_id: "WO".to_string(),
            resource_id: resource_id.to_string(),
            group: PieceGroup {
                height_mm: 200,
                width_mm: 300,
            },
            quantity: 1,
            unit_time_minutes: 60,
            split_index: seq,
            start: dt(start_h),
            end: dt(start_h + 1),
            setup_applied: false,
            delay_minutes: 0,
            sequence_no: seq,
            predecessor_id: None,
            queue_position: seq,
            status: BatchStatus::Scheduled,
        }
    }

    fn chain() -> Vec<Batch> {
        vec![
            batch("M#1", "M", 1, 7),
            batch("M#2", "M", 2, 8),
            batch("M#3", "M", 3, 9),
            batch("N#1", "N", 1, 7),
        ]
    }

    #[test]
    fn test_delay_shifts_target_and_downstream_only() {
        let propagator = DelayPropagator::new();
        let mut batches = chain();
        let before = batches.clone();

        let outcome = propagator.apply(&mut batches, "M#2", 45).unwrap();

        assert_eq!(outcome.affected_batch_ids, vec!["M#2", "M#3"]);
        assert_eq!(batches[0], before[0]);
        assert_eq!(batches[3], before[3]);
        for i in [1, 2] {
            assert_eq!(batches[i].start, before[i].start + Duration::minutes(45));
            assert_eq!(batches[i].end, before[i].end + Duration::minutes(45));
            assert_eq!(batches[i].delay_minutes, 45);
        }
        assert_eq!(batches[1].status, BatchStatus::Delayed);
        assert_eq!(batches[2].status, BatchStatus::Scheduled);
    }

    #[test]
    fn test_delays_accumulate() {
        let propagator = DelayPropagator::new();
        let mut batches = chain();

        propagator.apply(&mut batches, "M#1", 30).unwrap();
        propagator.apply(&mut batches, "M#2", 15).unwrap();

        assert_eq!(batches[0].delay_minutes, 30);
        assert_eq!(batches[1].delay_minutes, 45);
        assert_eq!(batches[2].delay_minutes, 45);
        assert_eq!(batches[2].start, dt(9) + Duration::minutes(45));
    }

    #[test]
    fn test_unknown_batch_is_not_found() {
        let propagator = DelayPropagator::new();
        let mut batches = chain();
        let err = propagator.apply(&mut batches, "NOPE", 10).unwrap_err();
        assert_eq!(
            err,
            EngineError::BatchNotFound {
                batch_id: "NOPE".to_string()
            }
        );
    }

    #[test]
    fn test_non_positive_delay_rejected() {
        let propagator = DelayPropagator::new();
        let mut batches = chain();
        let before = batches.clone();
        assert_eq!(
            propagator.apply(&mut batches, "M#1", 0).unwrap_err().code(),
            "INVALID_DELAY"
        );
        assert_eq!(batches, before);
    }

    #[test]
    fn test_overflowing_delay_rejected_without_mutation() {
        let propagator = DelayPropagator::new();
        let mut batches = chain();
        let before = batches.clone();

        // 超出 chrono 范围 / 超出落库年份 / 超出 i64 分钟
        for delay in [10_i64.pow(13), 10_i64.pow(10), i64::MAX] {
            let err = propagator.apply(&mut batches, "M#1", delay).unwrap_err();
            assert_eq!(err.code(), "INVALID_DELAY");
            assert_eq!(batches, before);
        }
    }
}
