//! 旅行规划对话：采集活动、目的地、日期、成人与儿童人数，最后生成行程

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::conversation::machine::{ConversationSpec, FnStep, StepHandler};
use crate::conversation::state::SharedState;
use crate::core::{AgentError, ConversationError};
use crate::itinerary::{ItineraryPlanner, ItineraryRequest};

pub const ACTIVITIES: &str = "activities";
pub const DESTINATION: &str = "destination";
pub const DATES: &str = "dates";
pub const ADULTS: &str = "adults";
pub const CHILDREN: &str = "children";
pub const ITINERARY: &str = "itinerary";

/// 所有状态键，itinerary 在最后
pub const STATE_KEYS: [&str; 6] = [ACTIVITIES, DESTINATION, DATES, ADULTS, CHILDREN, ITINERARY];

pub fn initial_state() -> SharedState {
    SharedState::with_keys(STATE_KEYS)
}

fn collect_text(key: &'static str) -> FnStep<impl Fn(&mut SharedState, Option<&str>) -> Result<(), ConversationError>> {
    FnStep::new(move |state: &mut SharedState, input: Option<&str>| {
        let text = input.unwrap_or_default().trim();
        if text.is_empty() {
            state.set(key, Value::Null);
        } else {
            state.set(key, text);
        }
        Ok(())
    })
}

/// 人数：空输入表示不指定，否则必须是非负整数
pub fn parse_count(input: &str) -> Result<Option<u32>, ConversationError> {
    let text = input.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<u32>()
        .map(Some)
        .map_err(|_| ConversationError::InvalidInput(format!("'{text}' is not a number. Please enter a whole number, e.g. 2.")))
}

fn collect_count(key: &'static str) -> FnStep<impl Fn(&mut SharedState, Option<&str>) -> Result<(), ConversationError>> {
    FnStep::new(move |state: &mut SharedState, input: Option<&str>| {
        match parse_count(input.unwrap_or_default())? {
            Some(n) => state.set(key, n),
            None => state.set(key, Value::Null),
        }
        Ok(())
    })
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// 把已采集的状态拼成自然语言需求；未设置的项省略
pub fn itinerary_prompt(state: &SharedState) -> String {
    let mut components = Vec::new();
    if state.is_set(DESTINATION) {
        components.push(format!("a trip to {}", display(state.get(DESTINATION))));
    }
    if state.is_set(DATES) {
        components.push(format!("from {}", display(state.get(DATES))));
    }
    if state.is_set(ACTIVITIES) {
        components.push(format!("including activities such as {}", display(state.get(ACTIVITIES))));
    }
    if state.is_set(ADULTS) {
        components.push(format!("with {} adults", display(state.get(ADULTS))));
    }
    if state.is_set(CHILDREN) {
        components.push(format!("and {} children", display(state.get(CHILDREN))));
    }
    if components.is_empty() {
        "Create a general itinerary.".to_string()
    } else {
        format!("Create an itinerary for {}.", components.join(", "))
    }
}

/// 把结构化行程参数写入状态（「出行灵感」流程）
pub fn apply_request(state: &mut SharedState, request: &ItineraryRequest) {
    let destinations: Vec<&str> = request.destinations.iter().map(|d| d.location.as_str()).collect();
    let activities: Vec<String> = request
        .destinations
        .iter()
        .flat_map(|d| d.activities.iter().map(move |a| format!("{} in {}", a.name, d.location)))
        .collect();
    state.set(ACTIVITIES, activities.join("; "));
    state.set(DESTINATION, destinations.join(", "));
    state.set(DATES, format!("{} to {}", request.start_date, request.end_date));
    // 结构化请求里的 0 表示未指定
    for (key, count) in [(ADULTS, request.number_of_adults), (CHILDREN, request.number_of_children)] {
        if count > 0 {
            state.set(key, count);
        }
    }
}

/// 终止步骤：调用行程规划器并把结果写入 itinerary
pub struct CreateItinerary {
    planner: Arc<ItineraryPlanner>,
}

impl CreateItinerary {
    pub fn new(planner: Arc<ItineraryPlanner>) -> Self {
        Self { planner }
    }
}

#[async_trait]
impl StepHandler for CreateItinerary {
    async fn handle(
        &self,
        state: &mut SharedState,
        _input: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), ConversationError> {
        let prompt = itinerary_prompt(state);
        tracing::info!(%prompt, "creating itinerary");
        let itinerary = self.planner.generate_itinerary(&prompt, cancel).await?;
        let value = serde_json::to_value(&itinerary).map_err(|e| AgentError::MalformedOutput {
            reason: format!("itinerary is not serializable: {e}"),
            raw: String::new(),
        })?;
        state.set(ITINERARY, value);
        Ok(())
    }
}

/// 旅行规划对话定义：五个采集步骤（均可作为入口）+ 行程生成
pub fn travel_conversation(terminal: impl StepHandler + 'static) -> Result<ConversationSpec, ConversationError> {
    ConversationSpec::builder()
        .entry_step(
            "collect_activities",
            "Please enter the activities you're interested in (e.g., concert, museum visit): ",
            ACTIVITIES,
            collect_text(ACTIVITIES),
        )
        .entry_step(
            "collect_destination",
            "Please enter the destination of your trip: ",
            DESTINATION,
            collect_text(DESTINATION),
        )
        .entry_step(
            "collect_dates",
            "Please enter the dates of your trip (e.g., YYYY-MM-DD to YYYY-MM-DD): ",
            DATES,
            collect_text(DATES),
        )
        .entry_step(
            "collect_adults",
            "Please enter the number of adults: ",
            ADULTS,
            collect_count(ADULTS),
        )
        .entry_step(
            "collect_children",
            "Please enter the number of children: ",
            CHILDREN,
            collect_count(CHILDREN),
        )
        .finish("create_itinerary", terminal)
}
