//! Agent 过程事件：用于向前端推送思考、工具调用、观察与最终答案

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 步数更新（当前第几步）
    StepUpdate { step: usize, max_steps: usize },
    /// 正在调用模型
    Thinking,
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 工具执行失败（已作为观察写入 scratchpad）
    ToolFailure { tool: String, reason: String },
    /// 得到最终答案
    FinalAnswer { schema: String },
    /// 错误
    Error { text: String },
}
