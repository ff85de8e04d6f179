//! 人设语气：把展示给用户的提示改写为某个角色的口吻
//!
//! 默认不改写；LLM 实现失败时退回原文，不影响对话流程。

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;

#[async_trait]
pub trait PersonaVoice: Send + Sync {
    async fn transform(&self, text: &str) -> String;
}

/// 原样返回
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainVoice;

#[async_trait]
impl PersonaVoice for PlainVoice {
    async fn transform(&self, text: &str) -> String {
        text.to_string()
    }
}

/// 用 LLM 以指定人设改写提示
pub struct LlmPersonaVoice {
    llm: Arc<dyn LlmClient>,
    persona: String,
}

impl LlmPersonaVoice {
    pub fn new(llm: Arc<dyn LlmClient>, persona: impl Into<String>) -> Self {
        Self {
            llm,
            persona: persona.into(),
        }
    }
}

#[async_trait]
impl PersonaVoice for LlmPersonaVoice {
    async fn transform(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        let request = format!("Rewrite the following prompt in {}: {}", self.persona, text);
        match self.llm.complete(&[Message::user(request)]).await {
            Ok(rewritten) if !rewritten.trim().is_empty() => {
                // 采集提示后换行，用户在下一行输入
                format!("{}\n", rewritten.trim_end())
            }
            Ok(_) => text.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "persona rewrite failed, using original text");
                text.to_string()
            }
        }
    }
}
