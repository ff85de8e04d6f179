//! Wander - 对话式旅行规划助手
//!
//! 模块划分：
//! - **agent**: 无界面组装（LLM、外部服务、Agent 循环、旅行对话）
//! - **config**: 应用配置加载（TOML + 环境变量）与凭据
//! - **conversation**: 步骤式会话状态机与旅行规划对话
//! - **core**: 错误类型、会话监管（取消）
//! - **itinerary**: 行程数据模型与生成器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 模型消息与 scratchpad
//! - **profile**: 个人偏好档案
//! - **react**: 回复解析、Agent 主循环、过程事件
//! - **tools**: 工具目录、执行器、Schema 与外部查询工具

pub mod agent;
pub mod config;
pub mod conversation;
pub mod core;
pub mod itinerary;
pub mod llm;
pub mod memory;
pub mod profile;
pub mod react;
pub mod tools;

pub use agent::TravelAgent;
pub use core::{AgentError, ConversationError};
pub use react::{AgentLoop, AgentRequest, AgentStep};
