//! Scratchpad：单次 invoke 内的 (工具调用, 观察结果) 有序记录
//!
//! 只追加、不改写；每轮规划前序列化为 assistant(function_call) + function(result) 消息对，
//! 让模型看到自己之前的动作与结果。

use serde::Serialize;

use crate::memory::{FunctionCall, Message};
use crate::react::ToolInvocation;

/// 一条记录：模型请求的调用与工具返回的观察（失败时为错误描述）
#[derive(Clone, Debug, Serialize)]
pub struct TranscriptEntry {
    pub invocation: ToolInvocation,
    pub observation: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, invocation: ToolInvocation, observation: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            invocation,
            observation: observation.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按调用顺序列出用过的工具名（可重复）
    pub fn tool_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.invocation.tool_name.as_str())
            .collect()
    }

    /// 序列化为模型消息；缺少调用 ID 的记录按序号补 call_{i}
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.entries.len() * 2);
        for (i, entry) in self.entries.iter().enumerate() {
            let id = entry
                .invocation
                .call_id
                .clone()
                .unwrap_or_else(|| format!("call_{i}"));
            let call = FunctionCall::new(
                entry.invocation.tool_name.clone(),
                entry.invocation.arguments.to_string(),
            )
            .with_id(id);
            let result = Message::function_result(&call, entry.observation.clone());
            messages.push(Message::assistant_call(call));
            messages.push(result);
        }
        messages
    }
}
