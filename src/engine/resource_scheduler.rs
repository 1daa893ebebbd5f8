// ==========================================
// 预制构件模具排产系统 - 模具排程器
// ==========================================
// 职责: 按全局队列顺序,为每个批次在其模具的 FS 链上分配起止时间
// 输入: 全局有序批次 + 模具目录 + 工作日历 + 当前时刻
// 输出: 已排程批次 (Batch) + 跳过项
// ==========================================
// 规则:
// - 每个模具维护独立游标 (上一批次结束时间/分组/ID/序号)
// - 与上一批次分组不同 → 先推进换型分钟,setup_applied = true
// - start 对齐到下一工作时刻; end = start + 数量 × 单件工时 (工作分钟)
// 红线: 同模具 b.start >= predecessor.end; 不使用全局可变状态
// ==========================================

use crate::domain::batch::{Batch, PackedBatch};
use crate::domain::resource::Resource;
use crate::domain::work_order::PieceGroup;
use crate::engine::calendar::WorkCalendar;
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};

// ==========================================
// ResourceCursor - 模具游标
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCursor {
    pub last_end: NaiveDateTime,
    pub last_group: PieceGroup,
    pub last_batch_id: String,
    pub last_sequence_no: u32,
}

impl ResourceCursor {
    fn from_batch(batch: &Batch) -> Self {
        Self {
            last_end: batch.end,
            last_group: batch.group,
            last_batch_id: batch.batch_id.clone(),
            last_sequence_no: batch.sequence_no,
        }
    }
}

// ==========================================
// ScheduleOutcome - 排程结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ScheduleOutcome {
    pub batches: Vec<Batch>,
    pub skipped: Vec<(PackedBatch, EngineError)>,
}

// ==========================================
// ResourceScheduler - 模具排程器
// ==========================================
pub struct ResourceScheduler<'a> {
    calendar: &'a WorkCalendar,
    resources: HashMap<&'a str, &'a Resource>,
    now: NaiveDateTime,
    cursors: BTreeMap<String, ResourceCursor>,
}

impl<'a> ResourceScheduler<'a> {
    /// 创建排程器 (所有模具游标为空)
    pub fn new(calendar: &'a WorkCalendar, resources: &'a [Resource], now: NaiveDateTime) -> Self {
        Self {
            calendar,
            resources: resources
                .iter()
                .map(|r| (r.resource_id.as_str(), r))
                .collect(),
            now,
            cursors: BTreeMap::new(),
        }
    }

    /// 用已提交的时间线初始化游标 (每个模具取序号最大的批次)
    pub fn with_existing(mut self, committed: &[Batch]) -> Self {
        for batch in committed {
            let replace = match self.cursors.get(&batch.resource_id) {
                Some(cursor) => batch.sequence_no > cursor.last_sequence_no,
                None => true,
            };
            if replace {
                self.cursors
                    .insert(batch.resource_id.clone(), ResourceCursor::from_batch(batch));
            }
        }
        self
    }

    pub fn cursor(&self, resource_id: &str) -> Option<&ResourceCursor> {
        self.cursors.get(resource_id)
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 按全局顺序排程所有批次
    ///
    /// 单个批次失败(模具缺失 / 日历耗尽)只跳过该批次,不影响其余批次
    #[instrument(skip(self, queue), fields(queue_len = queue.len(), now = %self.now))]
    pub fn schedule_all(&mut self, queue: Vec<PackedBatch>) -> ScheduleOutcome {
        let mut outcome = ScheduleOutcome::default();

        for packed in queue {
            match self.place(&packed) {
                Ok(batch) => outcome.batches.push(batch),
                Err(err) => {
                    warn!(
                        batch_id = %packed.batch_id,
                        resource_id = %packed.resource_id,
                        code = err.code(),
                        error = %err,
                        "批次排程失败,跳过"
                    );
                    outcome.skipped.push((packed, err));
                }
            }
        }

        debug!(
            scheduled = outcome.batches.len(),
            skipped = outcome.skipped.len(),
            "模具排程完成"
        );
        outcome
    }

    /// 排程单个批次并推进该模具游标
    pub fn place(&mut self, packed: &PackedBatch) -> EngineResult<Batch> {
        let resource = self
            .resources
            .get(packed.resource_id.as_str())
            .copied()
            .ok_or_else(|| EngineError::DanglingResourceReference {
                resource_id: packed.resource_id.clone(),
                referenced_by: packed.batch_id.clone(),
            })?;

        let previous = self.cursors.get(&resource.resource_id);

        // 步骤1: 最早可开始时刻
        let mut earliest = match previous {
            Some(cursor) => cursor.last_end,
            None => self.calendar.next_working_instant(self.now)?,
        };

        // 步骤2: 换型
        let setup_applied = matches!(previous, Some(cursor) if cursor.last_group != packed.group);
        if setup_applied {
            earliest = self
                .calendar
                .advance_working_minutes(earliest, resource.setup_minutes)?;
        }

        // 步骤3-4: 起止时间
        let start = self.calendar.next_working_instant(earliest)?;
        let end = self
            .calendar
            .advance_working_minutes(start, packed.production_minutes())?;

        // 步骤5: FS 链
        let predecessor_id = previous.map(|c| c.last_batch_id.clone());
        let sequence_no = previous.map(|c| c.last_sequence_no).unwrap_or(0) + 1;

        let batch = Batch::from_packed(
            packed.clone(),
            start,
            end,
            setup_applied,
            sequence_no,
            predecessor_id,
        );
        self.cursors
            .insert(batch.resource_id.clone(), ResourceCursor::from_batch(&batch));

        debug!(
            batch_id = %batch.batch_id,
            resource_id = %batch.resource_id,
            start = %batch.start,
            end = %batch.end,
            setup_applied,
            sequence_no,
            "批次已排程"
        );
        Ok(batch)
    }
}
