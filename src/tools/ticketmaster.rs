//! Ticketmaster Discovery API：按关键词、城市与时间窗口查询活动
//!
//! 返回精简后的活动列表（名称、日期、场馆、链接、图片）；无结果时返回固定提示文本。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::datetime::{parse_iso8601, to_utc_seconds};
use crate::tools::schema::{parameters_for, parse_args};
use crate::tools::Tool;

pub const TICKETMASTER_BASE_URL: &str = "https://app.ticketmaster.com/discovery/v2";
const NO_EVENTS: &str = "No events found for the specified query.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TicketmasterQuery {
    /// Keyword for event search
    pub keyword: String,
    /// Location for event search
    pub location: String,
    /// Start date for event search in ISO 8601 format
    pub start_date: String,
    /// End date for event search in ISO 8601 format
    pub end_date: String,
}

pub struct TicketmasterEventsTool {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl TicketmasterEventsTool {
    pub fn new(http: reqwest::Client, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn query(&self, q: TicketmasterQuery) -> Result<Value, String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "TICKETMASTER_API_KEY must be set".to_string())?;
        let start = to_utc_seconds(&parse_iso8601(&q.start_date)?);
        let end = to_utc_seconds(&parse_iso8601(&q.end_date)?);
        tracing::info!(keyword = %q.keyword, location = %q.location, %start, %end, "ticketmaster query");

        let resp = self
            .http
            .get(format!("{}/events.json", self.base_url))
            .query(&[
                ("apikey", api_key),
                ("keyword", q.keyword.as_str()),
                ("locale", "*"),
                ("city", q.location.as_str()),
                ("startDateTime", start.as_str()),
                ("endDateTime", end.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("Failed to retrieve data: {}", resp.status().as_u16()));
        }
        let data: Value = resp.json().await.map_err(|e| format!("Read body: {e}"))?;
        Ok(summarize_events(&data))
    }
}

/// 从 Discovery 响应中提取活动摘要
pub fn summarize_events(data: &Value) -> Value {
    let total = data["page"]["totalElements"].as_u64().unwrap_or(0);
    let events = data["_embedded"]["events"].as_array();
    match events {
        Some(events) if total > 0 && !events.is_empty() => Value::Array(
            events
                .iter()
                .map(|e| {
                    json!({
                        "id": e["id"],
                        "name": e["name"],
                        "url": e["url"],
                        "date": e["dates"]["start"]["localDate"],
                        "time": e["dates"]["start"]["localTime"],
                        "venue": e["_embedded"]["venues"][0]["name"],
                        "image_url": e["images"][0]["url"],
                    })
                })
                .collect(),
        ),
        _ => Value::String(NO_EVENTS.to_string()),
    }
}

#[async_trait]
impl Tool for TicketmasterEventsTool {
    fn name(&self) -> &str {
        "ticketmaster_events"
    }

    fn description(&self) -> &str {
        "Useful for querying Ticketmaster for scheduled event listings and dates"
    }

    fn parameters_schema(&self) -> Value {
        parameters_for::<TicketmasterQuery>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query: TicketmasterQuery = parse_args(args)?;
        self.query(query).await
    }
}
