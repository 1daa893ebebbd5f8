// ==========================================
// 预制构件模具排产系统 - 引擎层
// ==========================================
// 职责: 实现排产规则 (日历 / 装箱 / 队列 / 排程 / 延误 / 预估)
// 红线: Engine 不拼 SQL, 跳过项必须输出 code + reason
// ==========================================

pub mod availability;
pub mod calendar;
pub mod capacity_packer;
pub mod clock;
pub mod delay_propagator;
pub mod error;
pub mod orchestrator;
pub mod queue_builder;
pub mod resource_scheduler;

// 重导出核心引擎
pub use availability::{
    AvailabilityEstimate, AvailabilityEstimator, BatchWindow, ResourceProjection,
    SuggestionRequest,
};
pub use calendar::{CalendarSettings, WorkCalendar};
pub use capacity_packer::{CandidateResource, CapacityPacker, PackResult};
pub use clock::{Clock, FixedClock, SystemClock};
pub use delay_propagator::{DelayOutcome, DelayPropagator};
pub use error::{EngineError, EngineResult};
pub use orchestrator::{RescheduleInput, RescheduleOrchestrator, RescheduleOutcome, SkippedItem};
pub use queue_builder::{QueueBuilder, QueueOutcome};
pub use resource_scheduler::{ResourceCursor, ResourceScheduler, ScheduleOutcome};
