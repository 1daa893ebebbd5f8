// ==========================================
// 预制构件模具排产系统 - API 层
// ==========================================
// 职责: 提供排程业务接口,供 CLI / 上层服务调用
// ==========================================

pub mod dto;
pub mod error;
pub mod schedule_api;

// 重导出核心类型
pub use dto::{
    AlternativeSuggestion, ApplyDelayRequest, ApplyDelayResponse, RescheduleResponse,
    ResourceRef, ResourceSchedule, SuggestDateResponse, TimeWindow, DEFAULT_ACTOR,
};
pub use error::{ApiError, ApiResult};
pub use schedule_api::ScheduleApi;
