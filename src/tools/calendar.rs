//! Google Calendar（只读）：列出事件、查询忙闲并计算空闲时段
//!
//! 访问令牌由宿主注入（GOOGLE_CALENDAR_TOKEN）；缺失时工具返回描述性错误。

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::datetime::parse_iso8601;
use crate::tools::schema::{parameters_for, parse_args};
use crate::tools::Tool;

pub const GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const MAX_RESULTS_LIMIT: u32 = 20;
const NO_EVENTS: &str = "No events found in that time span.";
const NO_BUSY: &str = "No busy times found in that time span.";
const NO_FREE: &str = "No free times found.";

#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    access_token: Option<String>,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(http: reqwest::Client, access_token: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            access_token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            calendar_id: "primary".to_string(),
        }
    }

    /// 参数未指定 calendar_id 时使用的日历
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    fn calendar_or_default(&self, calendar_id: Option<String>) -> String {
        calendar_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.calendar_id.clone())
    }

    fn token(&self) -> Result<&str, String> {
        self.access_token
            .as_deref()
            .ok_or_else(|| "GOOGLE_CALENDAR_TOKEN must be set to access the calendar".to_string())
    }

    /// {base}/calendars/{id}/events，calendar_id 按路径段编码
    fn events_url(&self, calendar_id: &str) -> Result<reqwest::Url, String> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| format!("Invalid calendar base URL: {e}"))?;
        url.path_segments_mut()
            .map_err(|_| "Invalid calendar base URL".to_string())?
            .extend(["calendars", calendar_id, "events"]);
        Ok(url)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, String> {
        let resp = req
            .bearer_auth(self.token()?)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("Failed to retrieve data: {}", resp.status().as_u16()));
        }
        resp.json().await.map_err(|e| format!("Read body: {e}"))
    }
}

fn default_max_results() -> u32 {
    MAX_RESULTS_LIMIT
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListEventsParams {
    /// Calendar identifier, "primary" for the user's main calendar
    #[serde(default)]
    pub calendar_id: Option<String>,
    /// Maximum number of events to return (at most 20, the default)
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Start of the time span in ISO 8601 format, defaults to now
    #[serde(default)]
    pub start_time: Option<String>,
    /// End of the time span in ISO 8601 format, defaults to a week after the start
    #[serde(default)]
    pub end_time: Option<String>,
    /// IANA time zone used to render event times
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// 解析可选的时间窗口；缺省起点为 now，终点为起点 + default_span
fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    default_span: Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    let start = match start {
        Some(s) => parse_iso8601(s)?,
        None => Utc::now(),
    };
    let end = match end {
        Some(e) => parse_iso8601(e)?,
        None => start + default_span,
    };
    if end <= start {
        return Err("End time must be after start time".to_string());
    }
    Ok((start, end))
}

/// 事件时间：dateTime 或全天事件的 date
fn event_time(v: &Value) -> Value {
    v.get("dateTime").or_else(|| v.get("date")).cloned().unwrap_or(Value::Null)
}

fn format_time(v: &Value) -> String {
    match v.as_str() {
        Some(s) => parse_iso8601(s)
            .map(|dt| dt.format("%a %b %-d %Y, %H:%M UTC").to_string())
            .unwrap_or_else(|_| s.to_string()),
        None => String::new(),
    }
}

/// 将 events.list 响应整理为 {start, end, summary, start_formatted, end_formatted}
pub fn summarize_calendar_events(data: &Value) -> Value {
    match data["items"].as_array() {
        Some(items) if !items.is_empty() => Value::Array(
            items
                .iter()
                .map(|item| {
                    let start = event_time(&item["start"]);
                    let end = event_time(&item["end"]);
                    json!({
                        "start_formatted": format_time(&start),
                        "end_formatted": format_time(&end),
                        "start": start,
                        "end": end,
                        "summary": item["summary"].as_str().unwrap_or("No Title"),
                    })
                })
                .collect(),
        ),
        _ => Value::String(NO_EVENTS.to_string()),
    }
}

pub struct ListEventsTool {
    client: GoogleCalendarClient,
}

impl ListEventsTool {
    pub fn new(client: GoogleCalendarClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListEventsTool {
    fn name(&self) -> &str {
        "list_events"
    }

    fn description(&self) -> &str {
        "List upcoming events from the user's Google Calendar within a time span"
    }

    fn parameters_schema(&self) -> Value {
        parameters_for::<ListEventsParams>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let p: ListEventsParams = parse_args(args)?;
        let (start, end) = resolve_window(p.start_time.as_deref(), p.end_time.as_deref(), Duration::days(7))?;
        let max_results = p.max_results.clamp(1, MAX_RESULTS_LIMIT);
        let calendar_id = self.client.calendar_or_default(p.calendar_id);
        tracing::info!(calendar = %calendar_id, %start, %end, max_results, "list calendar events");
        let url = self.client.events_url(&calendar_id)?;
        let req = self.client.http.get(url).query(&[
            ("timeMin", start.to_rfc3339()),
            ("timeMax", end.to_rfc3339()),
            ("maxResults", max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("timeZone", p.timezone),
        ]);
        let data = self.client.send(req).await?;
        Ok(summarize_calendar_events(&data))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FreeBusyParams {
    /// Calendar identifier, "primary" for the user's main calendar
    #[serde(default)]
    pub calendar_id: Option<String>,
    /// Start of the time span in ISO 8601 format, defaults to now
    #[serde(default)]
    pub start_time: Option<String>,
    /// End of the time span in ISO 8601 format, defaults to 90 days after the start
    #[serde(default)]
    pub end_time: Option<String>,
}

/// 在 [start, end) 内求 busy 区间的补集；busy 可无序、可重叠
pub fn free_slots(
    busy: &[(DateTime<Utc>, DateTime<Utc>)],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut sorted: Vec<_> = busy.to_vec();
    sorted.sort_by_key(|(s, _)| *s);
    let mut slots = Vec::new();
    let mut cursor = start;
    for (b_start, b_end) in sorted {
        if b_end <= cursor {
            continue;
        }
        if b_start >= end {
            break;
        }
        if b_start > cursor {
            slots.push((cursor, b_start));
        }
        cursor = cursor.max(b_end);
    }
    if cursor < end {
        slots.push((cursor, end));
    }
    slots
}

fn busy_periods(data: &Value, calendar_id: &str) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, String> {
    let Some(busy) = data["calendars"][calendar_id]["busy"].as_array() else {
        return Ok(Vec::new());
    };
    busy.iter()
        .map(|b| -> Result<_, String> {
            let s = parse_iso8601(b["start"].as_str().unwrap_or_default())?;
            let e = parse_iso8601(b["end"].as_str().unwrap_or_default())?;
            Ok((s, e))
        })
        .collect()
}

pub struct FreeBusyTool {
    client: GoogleCalendarClient,
}

impl FreeBusyTool {
    pub fn new(client: GoogleCalendarClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FreeBusyTool {
    fn name(&self) -> &str {
        "free_busy"
    }

    fn description(&self) -> &str {
        "Find busy and free time slots in the user's Google Calendar"
    }

    fn parameters_schema(&self) -> Value {
        parameters_for::<FreeBusyParams>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let p: FreeBusyParams = parse_args(args)?;
        let (start, end) = resolve_window(p.start_time.as_deref(), p.end_time.as_deref(), Duration::days(90))?;
        let calendar_id = self.client.calendar_or_default(p.calendar_id);
        tracing::info!(calendar = %calendar_id, %start, %end, "calendar free/busy");
        let body = json!({
            "timeMin": start.to_rfc3339(),
            "timeMax": end.to_rfc3339(),
            "items": [{ "id": calendar_id }],
        });
        let req = self.client.http.post(format!("{}/freeBusy", self.client.base_url)).json(&body);
        let data = self.client.send(req).await?;
        let busy = busy_periods(&data, &calendar_id)?;
        if busy.is_empty() {
            return Ok(Value::String(NO_BUSY.to_string()));
        }
        let free = free_slots(&busy, start, end);
        let to_json = |slots: &[(DateTime<Utc>, DateTime<Utc>)]| -> Value {
            slots
                .iter()
                .map(|(s, e)| json!({ "start": s.to_rfc3339(), "end": e.to_rfc3339() }))
                .collect()
        };
        let free = if free.is_empty() {
            Value::String(NO_FREE.to_string())
        } else {
            to_json(&free[..])
        };
        Ok(json!({ "busy": to_json(&busy[..]), "free": free }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_iso8601(s).unwrap()
    }

    #[test]
    fn test_free_slots_between_unsorted_overlapping_busy() {
        let busy = vec![
            (at("2024-07-01T13:00:00Z"), at("2024-07-01T15:00:00Z")),
            (at("2024-07-01T09:00:00Z"), at("2024-07-01T10:00:00Z")),
            (at("2024-07-01T14:00:00Z"), at("2024-07-01T16:00:00Z")),
        ];
        let free = free_slots(&busy, at("2024-07-01T08:00:00Z"), at("2024-07-01T18:00:00Z"));
        assert_eq!(
            free,
            vec![
                (at("2024-07-01T08:00:00Z"), at("2024-07-01T09:00:00Z")),
                (at("2024-07-01T10:00:00Z"), at("2024-07-01T13:00:00Z")),
                (at("2024-07-01T16:00:00Z"), at("2024-07-01T18:00:00Z")),
            ]
        );
    }

    #[test]
    fn test_free_slots_fully_booked() {
        let busy = vec![(at("2024-07-01T00:00:00Z"), at("2024-07-02T00:00:00Z"))];
        assert!(free_slots(&busy, at("2024-07-01T08:00:00Z"), at("2024-07-01T18:00:00Z")).is_empty());
    }

    #[test]
    fn test_summarize_events_fallbacks() {
        let data = json!({"items": [
            {"start": {"date": "2024-07-03"}, "end": {"date": "2024-07-04"}},
            {"start": {"dateTime": "2024-07-05T10:00:00Z"}, "end": {"dateTime": "2024-07-05T11:00:00Z"}, "summary": "Dentist"}
        ]});
        let out = summarize_calendar_events(&data);
        assert_eq!(out[0]["summary"], "No Title");
        assert_eq!(out[0]["start"], "2024-07-03");
        assert_eq!(out[1]["summary"], "Dentist");
        assert_eq!(out[1]["start_formatted"], "Fri Jul 5 2024, 10:00 UTC");

        assert_eq!(summarize_calendar_events(&json!({"items": []})), Value::String(NO_EVENTS.to_string()));
    }

    #[test]
    fn test_events_url_encodes_calendar_id() {
        let client = GoogleCalendarClient::new(reqwest::Client::new(), None, GOOGLE_CALENDAR_BASE_URL);
        let url = client.events_url("team@group.calendar.google.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team@group.calendar.google.com/events"
        );
        let url = client.events_url("a/b").unwrap();
        assert!(url.as_str().ends_with("/calendars/a%2Fb/events"));
    }

    #[test]
    fn test_calendar_id_default() {
        let client = GoogleCalendarClient::new(reqwest::Client::new(), None, GOOGLE_CALENDAR_BASE_URL)
            .with_calendar_id("family@group.calendar.google.com");
        assert_eq!(client.calendar_or_default(None), "family@group.calendar.google.com");
        assert_eq!(client.calendar_or_default(Some("work".into())), "work");
    }

    #[test]
    fn test_list_events_requests_twenty_by_default() {
        let p: ListEventsParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(p.max_results, 20);
        assert_eq!(p.timezone, "UTC");
    }

    #[test]
    fn test_window_defaults_and_order() {
        let (s, e) = resolve_window(Some("2024-07-01"), None, Duration::days(7)).unwrap();
        assert_eq!(e - s, Duration::days(7));
        assert!(resolve_window(Some("2024-07-05"), Some("2024-07-01"), Duration::days(7)).is_err());
    }

    #[tokio::test]
    async fn test_missing_token_is_descriptive_failure() {
        let tool = ListEventsTool::new(GoogleCalendarClient::new(reqwest::Client::new(), None, GOOGLE_CALENDAR_BASE_URL));
        let err = tool.execute(Value::Null).await.unwrap_err();
        assert!(err.contains("GOOGLE_CALENDAR_TOKEN"));
    }
}
