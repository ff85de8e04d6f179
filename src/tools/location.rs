//! 地点坐标工具：用一次嵌套的 Agent 调用（无工具、Coordinates Schema）把地点描述转为经纬度

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::itinerary::Coordinates;
use crate::react::{AgentLoop, AgentRequest};
use crate::tools::schema::{parameters_for, parse_args};
use crate::tools::{OutputSchema, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LocationQuery {
    /// Description of the location to find coordinates for
    pub location_description: String,
}

pub struct LocationCoordinatesTool {
    agent: Arc<AgentLoop>,
    cancel_token: CancellationToken,
}

impl LocationCoordinatesTool {
    /// 嵌套调用沿用外层会话的取消令牌
    pub fn new(agent: Arc<AgentLoop>, cancel_token: CancellationToken) -> Self {
        Self { agent, cancel_token }
    }
}

pub fn coordinates_prompt(location_description: &str) -> String {
    format!(
        "Find the coordinates for {location_description} Respond with final answer using Coordinates output format and only the Coordinates output format."
    )
}

#[async_trait]
impl Tool for LocationCoordinatesTool {
    fn name(&self) -> &str {
        "location_coordinates"
    }

    fn description(&self) -> &str {
        "Useful for finding the latitude and longitude of a location based on its description"
    }

    fn parameters_schema(&self) -> Value {
        parameters_for::<LocationQuery>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let q: LocationQuery = parse_args(args)?;
        let request = AgentRequest::new(coordinates_prompt(&q.location_description), OutputSchema::of::<Coordinates>())
            .with_cancel_token(self.cancel_token.child_token());
        let result = self
            .agent
            .invoke(request)
            .await
            .map_err(|e| format!("Coordinates lookup failed: {e}"))?;
        Ok(result.answer.fields)
    }
}
