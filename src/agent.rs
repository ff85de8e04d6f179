//! 无界面组装：按配置构建 LLM、外部服务、Agent 循环、行程规划器与旅行对话
//!
//! main（REPL）与集成测试都通过 TravelAgent 驱动两种流程：
//! 从入口开始逐步采集（new_session + start），或由「出行灵感」直接生成（suggest_ideas + itinerary_from_idea）。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, Secrets};
use crate::conversation::travel::{apply_request, initial_state};
use crate::conversation::{
    travel_conversation, ConversationSession, ConversationSpec, CreateItinerary, LlmPersonaVoice, PersonaVoice,
    PlainVoice, SharedState,
};
use crate::core::{AgentError, ConversationError};
use crate::itinerary::{ideas_prompt, ItineraryPlanner, PromptsList, TravelServices};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::profile::read_profile;
use crate::react::{AgentLoop, Planner};
use crate::tools::{AmadeusClient, GoogleCalendarClient, TicketmasterEventsTool, ToolExecutor};

pub const SYSTEM_PROMPT: &str = "You are a travel planning assistant. \
Use the available functions to look up events, hotels, coordinates and calendar availability when they help. \
When you are done, answer by calling the requested output format function with every field filled in.";

/// 按 provider 与 API Key 选择后端；没有可用 Key 时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig, secrets: &Secrets) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    match (provider.as_str(), &secrets.deepseek_api_key, &secrets.openai_api_key) {
        ("deepseek", Some(key), _) => {
            tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
            Arc::new(create_deepseek_client(Some(key.as_str()), Some(&cfg.llm.model)))
        }
        ("openai", _, Some(key)) => {
            tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
            Arc::new(OpenAiClient::new(cfg.llm.base_url.as_deref(), &cfg.llm.model, Some(key.as_str())))
        }
        _ => {
            tracing::warn!(provider = %provider, "No API key set or provider unknown, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}

/// 所有外部服务共享的 HTTP 客户端
pub fn create_http_client(timeout_secs: u64) -> Result<reqwest::Client, AgentError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AgentError::ConfigError(format!("HTTP client: {e}")))
}

pub fn create_services(cfg: &AppConfig, secrets: &Secrets, http: reqwest::Client) -> TravelServices {
    TravelServices {
        ticketmaster: Arc::new(TicketmasterEventsTool::new(
            http.clone(),
            secrets.ticketmaster_api_key.clone(),
            cfg.tools.ticketmaster.base_url.clone(),
        )),
        amadeus: AmadeusClient::new(
            http.clone(),
            secrets.amadeus_api_key.clone(),
            secrets.amadeus_api_secret.clone(),
            cfg.tools.amadeus.base_url.clone(),
        ),
        calendar: GoogleCalendarClient::new(
            http,
            secrets.google_calendar_token.clone(),
            cfg.tools.calendar.base_url.clone(),
        )
        .with_calendar_id(cfg.tools.calendar.calendar_id.clone()),
    }
}

/// 组装好的旅行规划助手
pub struct TravelAgent {
    planner: Arc<ItineraryPlanner>,
    conversation: Arc<ConversationSpec>,
    voice: Arc<dyn PersonaVoice>,
    config: AppConfig,
}

impl TravelAgent {
    /// 由配置与凭据构建（LLM 按配置选择）
    pub fn from_config(cfg: AppConfig, secrets: &Secrets) -> anyhow::Result<Self> {
        let llm = create_llm_from_config(&cfg, secrets);
        Self::with_llm(cfg, secrets, llm)
    }

    /// 使用给定 LLM 构建（测试注入脚本化客户端）
    pub fn with_llm(cfg: AppConfig, secrets: &Secrets, llm: Arc<dyn LlmClient>) -> anyhow::Result<Self> {
        let http = create_http_client(cfg.tools.tool_timeout_secs).context("Failed to build HTTP client")?;
        let services = create_services(&cfg, secrets, http);

        let agent = AgentLoop::new(
            Planner::new(llm.clone(), SYSTEM_PROMPT, cfg.llm.timeouts.request),
            ToolExecutor::new(cfg.tools.tool_timeout_secs),
        )
        .with_max_steps(cfg.agent.max_steps)
        .with_schema_validation(cfg.agent.validate_schema);
        let planner = Arc::new(ItineraryPlanner::new(Arc::new(agent), services));

        let conversation = travel_conversation(CreateItinerary::new(planner.clone()))
            .context("Failed to build travel conversation")?;

        let voice: Arc<dyn PersonaVoice> = match (&cfg.app.persona, cfg.app.persona_enabled) {
            (Some(persona), true) => Arc::new(LlmPersonaVoice::new(llm.clone(), persona.clone())),
            _ => Arc::new(PlainVoice),
        };

        Ok(Self {
            planner,
            conversation: Arc::new(conversation),
            voice,
            config: cfg,
        })
    }

    pub fn conversation(&self) -> &Arc<ConversationSpec> {
        &self.conversation
    }

    pub fn voice(&self) -> &Arc<dyn PersonaVoice> {
        &self.voice
    }

    /// 新建一次旅行对话
    pub fn new_session(&self, cancel: CancellationToken) -> ConversationSession {
        ConversationSession::new(self.conversation.clone())
            .with_state(initial_state())
            .with_voice(self.voice.clone())
            .with_max_input_attempts(self.config.agent.max_input_attempts)
            .with_cancel_token(cancel)
    }

    /// 读取个人偏好（若配置），结合日历生成出行灵感
    pub async fn suggest_ideas(&self, cancel: &CancellationToken) -> anyhow::Result<PromptsList> {
        let preferences = match &self.config.app.profile_path {
            Some(path) => Some(read_profile(path)?),
            None => None,
        };
        let prompt = ideas_prompt(Utc::now());
        let ideas = self
            .planner
            .generate_prompts(&prompt, preferences.as_ref(), cancel)
            .await
            .context("Failed to generate travel ideas")?;
        Ok(ideas)
    }

    /// 把选中的灵感转为行程参数，写入新会话状态后直接执行终止步骤
    pub async fn itinerary_from_idea(
        &self,
        idea: &str,
        cancel: &CancellationToken,
    ) -> Result<SharedState, ConversationError> {
        let request = self.planner.generate_itinerary_request(idea, cancel).await?;
        tracing::info!(destinations = request.destinations.len(), "itinerary request extracted");
        let mut session = self.new_session(cancel.clone());
        apply_request(session.state_mut(), &request);
        session.jump_to_last().await?;
        Ok(session.into_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_uses_configured_attempts() {
        let mut cfg = AppConfig::default();
        cfg.agent.max_input_attempts = 1;
        let agent = TravelAgent::with_llm(cfg, &Secrets::default(), Arc::new(MockLlmClient)).unwrap();
        assert_eq!(agent.conversation().collection_len(), 5);
        let session = agent.new_session(CancellationToken::new());
        assert_eq!(session.state().len(), 6);
    }
}
