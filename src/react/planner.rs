//! Planner：拼装模型请求，并把模型回复解析为 AgentStep
//!
//! parse_model_reply 规则：
//! 1. 回复带函数调用：name 等于目标 Schema 名 → FinalAnswer（参数即字段）；否则 → ToolInvocation。
//! 2. 无函数调用：把文本当 JSON 解析，成功 → FinalAnswer，失败 → MalformedOutput。

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::{FunctionSpec, LlmClient, ModelReply};
use crate::memory::{Message, Transcript};

/// 模型请求执行的工具调用
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub tool_name: String,
    pub arguments: Value,
}

/// 模型给出的最终结构化答案
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalAnswer {
    pub fields: Value,
}

impl FinalAnswer {
    /// 反序列化为具体类型（如 Itinerary）
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, AgentError> {
        let raw = self.fields.to_string();
        serde_json::from_value(self.fields).map_err(|e| AgentError::MalformedOutput {
            reason: format!("final answer does not fit {}: {e}", std::any::type_name::<T>()),
            raw,
        })
    }
}

/// 单次解析的结果：二选一
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    ToolInvocation(ToolInvocation),
    FinalAnswer(FinalAnswer),
}

/// 解析模型回复
pub fn parse_model_reply(reply: &ModelReply, schema_name: &str) -> Result<AgentStep, AgentError> {
    if let Some(call) = &reply.function_call {
        let arguments: Value = if call.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.arguments).map_err(|e| AgentError::MalformedOutput {
                reason: format!("arguments of '{}' are not valid JSON: {e}", call.name),
                raw: call.arguments.clone(),
            })?
        };
        tracing::debug!(function = %call.name, "function call detected");
        if call.name == schema_name {
            return Ok(AgentStep::FinalAnswer(FinalAnswer { fields: arguments }));
        }
        return Ok(AgentStep::ToolInvocation(ToolInvocation {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments,
        }));
    }

    let content = reply.content.as_deref().unwrap_or("");
    tracing::debug!("no function call, parsing content as JSON");
    match serde_json::from_str::<Value>(content) {
        Ok(fields) => Ok(AgentStep::FinalAnswer(FinalAnswer { fields })),
        Err(e) => Err(AgentError::MalformedOutput {
            reason: format!("reply is neither a function call nor JSON: {e}"),
            raw: content.to_string(),
        }),
    }
}

/// Planner：持有 LLM、system prompt 与单次调用超时
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    timeout: Duration,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// system + 用户 prompt + scratchpad 回放
    pub fn build_messages(&self, prompt: &str, transcript: &Transcript) -> Vec<Message> {
        let mut messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(prompt.to_string()),
        ];
        messages.extend(transcript.to_messages());
        messages
    }

    pub async fn plan(
        &self,
        prompt: &str,
        transcript: &Transcript,
        functions: &[FunctionSpec],
    ) -> Result<ModelReply, AgentError> {
        let messages = self.build_messages(prompt, transcript);
        match tokio::time::timeout(self.timeout, self.llm.complete_with_functions(&messages, functions)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(AgentError::LlmError(e)),
            Err(_) => Err(AgentError::ModelTimeout(self.timeout.as_secs())),
        }
    }
}
