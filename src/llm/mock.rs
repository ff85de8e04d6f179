//! Mock LLM 客户端（无需 API）
//!
//! - MockLlmClient：离线演示用，直接调用最后一个绑定的函数（即目标 Schema），参数按 JSON Schema 生成占位值。
//! - ScriptedLlmClient：测试用，按顺序返回预设回复并记录每次请求。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::llm::{FunctionSpec, LlmClient, ModelReply};
use crate::memory::{Message, Role};

/// Mock 客户端：文本完成回显最后一条 User 消息；函数完成直接产出目标 Schema 的占位答案
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(last_user.to_string())
    }

    async fn complete_with_functions(
        &self,
        _messages: &[Message],
        functions: &[FunctionSpec],
    ) -> Result<ModelReply, String> {
        let target = functions
            .last()
            .ok_or_else(|| "Mock LLM: no functions bound".to_string())?;
        let args = skeleton_from_schema(&target.parameters);
        Ok(ModelReply::call(target.name.clone(), args.to_string()))
    }
}

/// 按 JSON Schema 生成占位值：字符串 "(mock)"、数字 0、数组空、对象逐字段递归
pub fn skeleton_from_schema(schema: &Value) -> Value {
    let ty = match schema.get("type") {
        Some(Value::String(t)) => t.as_str(),
        // ["string", "null"] 之类取第一个非 null
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != "null")
            .unwrap_or("null"),
        _ => "object",
    };
    match ty {
        "string" => Value::String("(mock)".to_string()),
        "integer" => Value::from(0),
        "number" => Value::from(0.0),
        "boolean" => Value::Bool(false),
        "array" => Value::Array(Vec::new()),
        "null" => Value::Null,
        _ => {
            let mut out = Map::new();
            if let Some(Value::Object(props)) = schema.get("properties") {
                for (name, sub) in props {
                    out.insert(name.clone(), skeleton_from_schema(sub));
                }
            }
            Value::Object(out)
        }
    }
}

/// 一次请求的记录：消息与绑定的函数名
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub function_names: Vec<String>,
}

/// 脚本化客户端：每次 complete_with_functions 弹出一条预设回复；脚本耗尽时返回错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<ModelReply, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: impl IntoIterator<Item = ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条失败回复（模拟网络/提供方错误）
    pub fn push_error(&self, err: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(err.into()));
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        match self.complete_with_functions(messages, &[]).await? {
            ModelReply {
                content: Some(text), ..
            } => Ok(text),
            _ => Err("Scripted reply has no text content".to_string()),
        }
    }

    async fn complete_with_functions(
        &self,
        messages: &[Message],
        functions: &[FunctionSpec],
    ) -> Result<ModelReply, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                messages: messages.to_vec(),
                function_names: functions.iter().map(|f| f.name.clone()).collect(),
            });
        }
        self.replies
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front()
            .unwrap_or_else(|| Err("Scripted LLM: no more replies".to_string()))
    }
}
