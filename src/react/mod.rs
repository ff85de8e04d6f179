//! 认知层：Planner / 回复解析、Agent 主循环、过程事件

pub mod events;
pub mod loop_;
pub mod planner;

pub use events::AgentEvent;
pub use loop_::{AgentLoop, AgentRequest, AgentResult, DEFAULT_MAX_STEPS};
pub use planner::{parse_model_reply, AgentStep, FinalAnswer, Planner, ToolInvocation};
