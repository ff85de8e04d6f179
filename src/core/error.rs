//! Agent 与会话状态机的错误类型
//!
//! AgentError 覆盖一次 invoke 内的所有失败（解析、Schema、工具、模型、取消、步数上限）；
//! 工具层失败（ToolExecutionFailed / ToolTimeout）由循环吸收为 Observation，不会传到调用方。

use thiserror::Error;

/// Agent 循环中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 模型请求调用目录中不存在的工具
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// 模型回复既不是函数调用也不是合法 JSON
    #[error("Malformed model output: {reason}")]
    MalformedOutput { reason: String, raw: String },

    /// 最终答案字段与目标 Schema 不一致
    #[error("Final answer does not match schema '{schema}' (missing: {missing:?}, extra: {extra:?})")]
    SchemaMismatch {
        schema: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Agent loop exceeded {0} steps without a final answer")]
    LoopExceeded(usize),

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Model call timed out after {0}s")]
    ModelTimeout(u64),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// 会话状态机错误
#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("Invalid entry point: {0}")]
    UnknownEntryPoint(String),

    /// 构建 ConversationSpec 时入口指向终止步骤或越界
    #[error("Entry point '{name}' -> {index} is outside the collection steps (0..{limit})")]
    InvalidEntryPoint {
        name: String,
        index: usize,
        limit: usize,
    },

    #[error("Duplicate entry point: {0}")]
    DuplicateEntryPoint(String),

    /// 采集步骤拒绝本次输入，状态机会重新提示
    #[error("{0}")]
    InvalidInput(String),

    #[error("Step '{step}' gave up after {attempts} invalid answers")]
    TooManyAttempts { step: String, attempts: usize },

    #[error("Session already finished")]
    SessionFinished,

    #[error("Input closed")]
    InputClosed,

    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cancelled")]
    Cancelled,

    #[error(transparent)]
    Agent(#[from] AgentError),
}
