//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：
//! complete（纯文本回复）、complete_with_functions（绑定函数列表，回复可能是文本或一次函数调用）。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::memory::{FunctionCall, Message};

/// 暴露给模型的函数：工具或最终输出 Schema
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema（type=object）
    pub parameters: Value,
}

/// 模型的一次原始回复：文本内容与/或函数调用
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelReply {
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            function_call: None,
        }
    }

    pub fn call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: None,
            function_call: Some(FunctionCall::new(name, arguments)),
        }
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 纯文本完成（persona 改写等）
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 带函数绑定的完成，temperature 固定为 0
    async fn complete_with_functions(
        &self,
        messages: &[Message],
        functions: &[FunctionSpec],
    ) -> Result<ModelReply, String>;
}
