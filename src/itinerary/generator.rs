//! 行程生成：把自然语言需求交给 Agent 循环，得到结构化的 Itinerary / ItineraryRequest / PromptsList
//!
//! 每种生成都绑定自己的工具目录与目标 Schema；外部服务客户端由宿主构造后注入。

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::AgentError;
use crate::itinerary::{Itinerary, ItineraryRequest, PromptsList};
use crate::react::{AgentLoop, AgentRequest};
use crate::tools::{
    AmadeusClient, AmadeusHotelListTool, AmadeusHotelOffersTool, FreeBusyTool, GoogleCalendarClient, ListEventsTool,
    LocationCoordinatesTool, OutputSchema, TicketmasterEventsTool, ToolRegistry,
};

const ITINERARY_SUFFIX: &str =
    " Respond with final answer using a single instance of the Itinerary output format and only the Itinerary output format.";
const REQUEST_SUFFIX: &str = "  Respond with final answer using a single instance of the ItineraryRequest output format and only the ItineraryRequest format.";
const PROMPTS_SUFFIX: &str =
    "  Respond with final answer using PromptsList output format and only the PromptsList output format.";

const IDEAS_INSTRUCTIONS: &str = "Generate 5 single day outing ideas, each having 400 characters or less. \
Include number of adults and children. If there are children, include some adult only events, and tailor those ideas accordingly. \
Base ideas on dates and times that make sense for the suggested ideas, such as whether it's a on a weekend or weekday and whether it's in the daytime or evening and include that reasoning for those decisions in the idea. \
Ensure suggested dates are within available date ranges based on calendar availability. \
Include a good balance of weekend and weekday activities if calendar availability allows. \
Make the ideas as diverse as possible. Do not number the ideas.";

/// 「出行灵感」的种子 prompt，带上当前 UTC 时间
pub fn ideas_prompt(now: DateTime<Utc>) -> String {
    format!(
        "Today's date and time is {}. {IDEAS_INSTRUCTIONS}",
        now.to_rfc3339_opts(SecondsFormat::Micros, false)
    )
}

/// 在种子 prompt 上追加个人偏好与日历约束
pub fn prompts_request(prompt: &str, preferences: Option<&Value>) -> String {
    let mut enhanced = match preferences {
        Some(prefs) => format!(
            "{prompt} based on preferences {prefs}. Exclude dates that are not available based on the calendar."
        ),
        None => format!("{prompt}. Exclude dates that are not available based on the calendar."),
    };
    enhanced.push_str(PROMPTS_SUFFIX);
    enhanced
}

/// 行程生成用到的外部服务
#[derive(Clone)]
pub struct TravelServices {
    pub ticketmaster: Arc<TicketmasterEventsTool>,
    pub amadeus: AmadeusClient,
    pub calendar: GoogleCalendarClient,
}

/// 行程规划器：共享一个 AgentLoop，按用途组装工具目录
pub struct ItineraryPlanner {
    agent: Arc<AgentLoop>,
    services: TravelServices,
}

impl ItineraryPlanner {
    pub fn new(agent: Arc<AgentLoop>, services: TravelServices) -> Self {
        Self { agent, services }
    }

    fn location_tool(&self, cancel: &CancellationToken) -> LocationCoordinatesTool {
        LocationCoordinatesTool::new(self.agent.clone(), cancel.clone())
    }

    /// 活动、酒店列表、酒店报价、坐标
    pub fn itinerary_tools(&self, cancel: &CancellationToken) -> Result<ToolRegistry, AgentError> {
        let mut tools = ToolRegistry::new();
        tools.register_arc(self.services.ticketmaster.clone())?;
        tools.register(AmadeusHotelListTool::new(self.services.amadeus.clone()))?;
        tools.register(AmadeusHotelOffersTool::new(self.services.amadeus.clone()))?;
        tools.register(self.location_tool(cancel))?;
        Ok(tools)
    }

    /// 由自然语言描述生成完整行程
    pub async fn generate_itinerary(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Itinerary, AgentError> {
        tracing::info!("generating itinerary");
        let request = AgentRequest::new(format!("{prompt}{ITINERARY_SUFFIX}"), OutputSchema::of::<Itinerary>())
            .with_tools(self.itinerary_tools(cancel)?)
            .with_cancel_token(cancel.clone());
        let result = self.agent.invoke(request).await?;
        tracing::info!(steps = result.steps, tools_used = result.transcript.len(), "itinerary generated");
        result.answer.into_typed()
    }

    /// 把一条出行灵感转为结构化的行程参数（只带坐标工具）
    pub async fn generate_itinerary_request(
        &self,
        idea: &str,
        cancel: &CancellationToken,
    ) -> Result<ItineraryRequest, AgentError> {
        let mut tools = ToolRegistry::new();
        tools.register(self.location_tool(cancel))?;
        let request = AgentRequest::new(format!("{idea}{REQUEST_SUFFIX}"), OutputSchema::of::<ItineraryRequest>())
            .with_tools(tools)
            .with_cancel_token(cancel.clone());
        self.agent.invoke(request).await?.answer.into_typed()
    }

    /// 结合个人偏好与日历可用时间生成出行灵感
    pub async fn generate_prompts(
        &self,
        prompt: &str,
        preferences: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<PromptsList, AgentError> {
        let mut tools = ToolRegistry::new();
        tools.register(ListEventsTool::new(self.services.calendar.clone()))?;
        tools.register(FreeBusyTool::new(self.services.calendar.clone()))?;
        let request = AgentRequest::new(prompts_request(prompt, preferences), OutputSchema::of::<PromptsList>())
            .with_tools(tools)
            .with_cancel_token(cancel.clone());
        self.agent.invoke(request).await?.answer.into_typed()
    }
}
