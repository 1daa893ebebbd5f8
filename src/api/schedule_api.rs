// ==========================================
// 预制构件模具排产系统 - 排程 API
// ==========================================
// 对外操作:
// - reschedule: 全量重排产,原子替换已提交批次集合
// - suggest_date: 只读交期预估
// - apply_delay: 人工延误,沿 FS 链级联
// - get_schedule: 按模具分组读取已提交排程
// ==========================================
// 并发:
// - 进程内: 读写闸门 (reschedule / apply_delay 写; suggest_date / get_schedule 读)
// - 跨进程: schedule_meta.revision 乐观锁,冲突 → ConcurrentRescheduleConflict
// 红线: 写入要么整体提交要么不提交; 每次提交写一条 action_log
// ==========================================

use crate::api::dto::{
    ApplyDelayRequest, ApplyDelayResponse, RescheduleResponse, ResourceSchedule,
    SuggestDateResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, SchedulerConfig};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::batch::Batch;
use crate::engine::availability::{AvailabilityEstimator, SuggestionRequest};
use crate::engine::calendar::WorkCalendar;
use crate::engine::clock::Clock;
use crate::engine::delay_propagator::DelayPropagator;
use crate::engine::error::EngineError;
use crate::engine::orchestrator::{RescheduleInput, RescheduleOrchestrator};
use crate::perf::PerfGuard;
use crate::repository::{
    ActionLogRepository, BatchRepository, CalendarRepository, PieceRequestRepository,
    ResourceRepository, WorkOrderRepository,
};
use chrono::NaiveDateTime;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ScheduleApi - 排程API
// ==========================================
pub struct ScheduleApi {
    resource_repo: Arc<ResourceRepository>,
    work_order_repo: Arc<WorkOrderRepository>,
    piece_request_repo: Arc<PieceRequestRepository>,
    batch_repo: Arc<BatchRepository>,
    calendar_repo: Arc<CalendarRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    clock: Arc<dyn Clock>,
    orchestrator: RescheduleOrchestrator,
    propagator: DelayPropagator,
    gate: RwLock<()>,
}

impl ScheduleApi {
    /// 创建新的ScheduleApi实例
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resource_repo: Arc<ResourceRepository>,
        work_order_repo: Arc<WorkOrderRepository>,
        piece_request_repo: Arc<PieceRequestRepository>,
        batch_repo: Arc<BatchRepository>,
        calendar_repo: Arc<CalendarRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resource_repo,
            work_order_repo,
            piece_request_repo,
            batch_repo,
            calendar_repo,
            action_log_repo,
            config_manager,
            clock,
            orchestrator: RescheduleOrchestrator::new(),
            propagator: DelayPropagator::new(),
            gate: RwLock::new(()),
        }
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 全量重排产
    ///
    /// # 返回
    /// - Ok: 提交后的批次集合 + 跳过项 + 新版本号
    /// - Err(ConcurrentRescheduleConflict): 计算期间排程被其他进程修改,未提交任何数据
    #[instrument(skip(self))]
    pub fn reschedule(&self, actor: &str) -> ApiResult<RescheduleResponse> {
        let _perf = PerfGuard::new("reschedule");
        let _write = self.write_gate();

        let expected_revision = self.batch_repo.current_revision()?;
        let config = self.config_manager.load_scheduler_config()?;
        let calendar = self.build_calendar(&config)?;
        let now = self.clock.now();

        let work_orders = self.work_order_repo.list_all()?;
        let requests = self.piece_request_repo.list_all()?;
        let resources = self.resource_repo.list_all()?;

        let outcome = self.orchestrator.run(&RescheduleInput {
            work_orders: &work_orders,
            requests: &requests,
            resources: &resources,
            calendar: &calendar,
            now,
        });

        let run_id = Uuid::new_v4().to_string();
        let log = self.action_log(
            ActionType::Reschedule,
            actor,
            now,
            json!({
                "run_id": run_id,
                "batch_count": outcome.batches.len(),
                "skipped_count": outcome.skipped.len(),
                "skipped": outcome.skipped,
            }),
        );

        let revision = self
            .batch_repo
            .replace_all(&outcome.batches, expected_revision, &run_id, now, log)?;

        info!(
            run_id = %run_id,
            revision,
            batch_count = outcome.batches.len(),
            skipped = outcome.skipped.len(),
            "重排产已提交"
        );

        Ok(RescheduleResponse {
            run_id,
            revision,
            batch_count: outcome.batches.len(),
            committed_batches: outcome.batches,
            skipped: outcome.skipped,
        })
    }

    /// 施加人工延误
    ///
    /// # 返回
    /// - Err(InvalidInput): delay_minutes <= 0,或平移后超出可表示时间
    /// - Err(BatchNotFound): 批次不存在
    #[instrument(skip(self, request), fields(batch_id = %request.batch_id, delay_minutes = request.delay_minutes))]
    pub fn apply_delay(&self, request: &ApplyDelayRequest, actor: &str) -> ApiResult<ApplyDelayResponse> {
        let _perf = PerfGuard::new("apply_delay");

        if request.delay_minutes <= 0 {
            return Err(EngineError::InvalidDelay {
                delay_minutes: request.delay_minutes,
            }
            .into());
        }

        let _write = self.write_gate();
        let expected_revision = self.batch_repo.current_revision()?;

        let target = self
            .batch_repo
            .find_by_id(&request.batch_id)?
            .ok_or_else(|| ApiError::BatchNotFound {
                batch_id: request.batch_id.clone(),
            })?;

        let mut chain = self.batch_repo.list_by_resource(&target.resource_id)?;
        let outcome = self
            .propagator
            .apply(&mut chain, &request.batch_id, request.delay_minutes)?;

        let affected: HashSet<&str> = outcome
            .affected_batch_ids
            .iter()
            .map(String::as_str)
            .collect();
        let changed: Vec<Batch> = chain
            .into_iter()
            .filter(|b| affected.contains(b.batch_id.as_str()))
            .collect();

        let now = self.clock.now();
        let log = self.action_log(
            ActionType::ApplyDelay,
            actor,
            now,
            json!({
                "batch_id": request.batch_id,
                "resource_id": outcome.resource_id,
                "delay_minutes": request.delay_minutes,
                "reason": request.reason,
                "affected_batch_ids": outcome.affected_batch_ids,
            }),
        );

        let revision = self
            .batch_repo
            .update_timings(&changed, expected_revision, now, log)?;

        info!(
            revision,
            resource_id = %outcome.resource_id,
            affected = outcome.affected_batch_ids.len(),
            "延误已提交"
        );

        Ok(ApplyDelayResponse {
            batch_id: request.batch_id.clone(),
            resource_id: outcome.resource_id,
            delay_minutes: request.delay_minutes,
            revision,
            affected_batch_count: outcome.affected_batch_ids.len(),
            affected_batch_ids: outcome.affected_batch_ids,
        })
    }

    // ==========================================
    // 读操作
    // ==========================================

    /// 交期预估 (只读)
    #[instrument(skip(self, request), fields(quantity = request.quantity))]
    pub fn suggest_date(&self, request: &SuggestionRequest) -> ApiResult<SuggestDateResponse> {
        let _perf = PerfGuard::new("suggest_date");
        let _read = self.read_gate();

        let config = self.config_manager.load_scheduler_config()?;
        let calendar = self.build_calendar(&config)?;
        let resources = self.resource_repo.list_all()?;
        let committed = self.batch_repo.list_all()?;

        let estimator = AvailabilityEstimator::new(config.suggestion_alternatives);
        let estimate = estimator.estimate(request, &resources, &committed, &calendar, self.clock.now())?;

        Ok(SuggestDateResponse::from_projections(
            estimate.selected,
            estimate.alternatives,
        ))
    }

    /// 已提交排程 (按模具分组, FS 链顺序)
    pub fn get_schedule(&self) -> ApiResult<Vec<ResourceSchedule>> {
        let _perf = PerfGuard::new("get_schedule");
        let _read = self.read_gate();

        let resources: BTreeMap<String, (String, String)> = self
            .resource_repo
            .list_all()?
            .into_iter()
            .map(|r| (r.resource_id, (r.code, r.name)))
            .collect();

        let mut grouped: BTreeMap<String, Vec<Batch>> = BTreeMap::new();
        for batch in self.batch_repo.list_all()? {
            grouped.entry(batch.resource_id.clone()).or_default().push(batch);
        }

        Ok(grouped
            .into_iter()
            .map(|(resource_id, mut batches)| {
                batches.sort_by_key(|b| b.sequence_no);
                let meta = resources.get(&resource_id);
                if meta.is_none() {
                    warn!(resource_id = %resource_id, "批次引用的模具已不在目录中");
                }
                ResourceSchedule {
                    resource_code: meta.map(|(code, _)| code.clone()),
                    resource_name: meta.map(|(_, name)| name.clone()),
                    resource_id,
                    batches,
                }
            })
            .collect())
    }

    /// 最近的操作日志
    pub fn recent_actions(&self, limit: i32) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_recent(limit)?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn build_calendar(&self, config: &SchedulerConfig) -> ApiResult<WorkCalendar> {
        let overrides = self.calendar_repo.list_all()?;
        Ok(WorkCalendar::new(config.calendar.clone()).with_overrides(overrides))
    }

    fn action_log(
        &self,
        action_type: ActionType,
        actor: &str,
        now: NaiveDateTime,
        payload: serde_json::Value,
    ) -> ActionLog {
        ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type,
            action_ts: now,
            actor: actor.to_string(),
            schedule_revision: 0,
            payload_json: Some(payload),
        }
    }

    // 门闩守护的是 (),中毒不携带需要回滚的状态,直接取回守卫继续
    fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(|poisoned| {
            warn!("排程写锁曾因 panic 中毒,已恢复");
            poisoned.into_inner()
        })
    }

    fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(|poisoned| {
            warn!("排程读锁曾因 panic 中毒,已恢复");
            poisoned.into_inner()
        })
    }
}
