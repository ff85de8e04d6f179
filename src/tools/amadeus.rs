//! Amadeus 酒店 API：按坐标列出酒店、按酒店 ID 查询报价
//!
//! 两个工具共享一个 AmadeusClient（HTTP 客户端 + 凭据），每次调用先用 client credentials 换取 access token。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::{parameters_for, parse_args};
use crate::tools::Tool;

/// 测试环境；生产为 https://api.amadeus.com
pub const AMADEUS_BASE_URL: &str = "https://test.api.amadeus.com";
/// 单次最多使用的酒店 ID 数
const MAX_HOTEL_IDS: usize = 10;

/// Amadeus 客户端：由宿主构造一次，克隆后传给各工具
#[derive(Clone)]
pub struct AmadeusClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_secret: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AmadeusClient {
    pub fn new(
        http: reqwest::Client,
        api_key: Option<String>,
        api_secret: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key,
            api_secret,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn access_token(&self) -> Result<String, String> {
        let (Some(key), Some(secret)) = (self.api_key.as_deref(), self.api_secret.as_deref()) else {
            return Err("Amadeus API key and secret must be set in environment variables.".to_string());
        };
        let resp = self
            .http
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", key),
                ("client_secret", secret),
            ])
            .send()
            .await
            .map_err(|e| format!("Token request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err("Failed to retrieve access token.".to_string());
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|_| "Failed to retrieve access token.".to_string())?;
        Ok(token.access_token)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, String> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        tracing::info!(path, status = resp.status().as_u16(), "amadeus response");
        if !resp.status().is_success() {
            return Err(format!("Failed to retrieve data: {}", resp.status().as_u16()));
        }
        resp.json().await.map_err(|e| format!("Read body: {e}"))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HotelListParams {
    /// Latitude for hotel search
    pub latitude: f64,
    /// Longitude for hotel search
    pub longitude: f64,
    /// Radius in kilometers for hotel search
    pub radius: u32,
}

/// 按坐标与半径列出酒店 ID（最多 10 个）
pub struct AmadeusHotelListTool {
    client: AmadeusClient,
}

impl AmadeusHotelListTool {
    pub fn new(client: AmadeusClient) -> Self {
        Self { client }
    }
}

/// 取前 MAX_HOTEL_IDS 个 hotelId
pub fn hotel_ids_from(data: &Value) -> Vec<String> {
    data["data"]
        .as_array()
        .map(|hotels| {
            hotels
                .iter()
                .filter_map(|h| h["hotelId"].as_str().map(String::from))
                .take(MAX_HOTEL_IDS)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Tool for AmadeusHotelListTool {
    fn name(&self) -> &str {
        "amadeus_hotel_list"
    }

    fn description(&self) -> &str {
        "Useful for listing hotels using the Amadeus API"
    }

    fn parameters_schema(&self) -> Value {
        parameters_for::<HotelListParams>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let p: HotelListParams = parse_args(args)?;
        let data = self
            .client
            .get_json(
                "/v1/reference-data/locations/hotels/by-geocode",
                &[
                    ("latitude", p.latitude.to_string()),
                    ("longitude", p.longitude.to_string()),
                    ("radius", p.radius.to_string()),
                ],
            )
            .await?;
        Ok(Value::from(hotel_ids_from(&data)))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HotelOffersParams {
    /// List of hotel IDs for offer search
    pub hotel_ids: Vec<String>,
    /// Start date for hotel search in ISO 8601 format
    pub start_date: String,
    /// End date for hotel search in ISO 8601 format
    pub end_date: String,
    pub number_of_adults: u32,
    pub number_of_children: u32,
}

/// 按酒店 ID、入住/退房日期与人数查询报价
pub struct AmadeusHotelOffersTool {
    client: AmadeusClient,
}

impl AmadeusHotelOffersTool {
    pub fn new(client: AmadeusClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for AmadeusHotelOffersTool {
    fn name(&self) -> &str {
        "amadeus_hotel_offers"
    }

    fn description(&self) -> &str {
        "Useful for searching hotel offers using the Amadeus API"
    }

    fn parameters_schema(&self) -> Value {
        parameters_for::<HotelOffersParams>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let p: HotelOffersParams = parse_args(args)?;
        if p.hotel_ids.is_empty() {
            return Err("At least one hotel ID is required".to_string());
        }
        let ids: Vec<&str> = p
            .hotel_ids
            .iter()
            .take(MAX_HOTEL_IDS)
            .map(String::as_str)
            .collect();
        // 报价接口只按成人数计价，儿童人数仅记录
        tracing::debug!(children = p.number_of_children, "hotel offers children not priced");
        let data = self
            .client
            .get_json(
                "/v3/shopping/hotel-offers",
                &[
                    ("hotelIds", ids.join(",")),
                    ("checkInDate", p.start_date),
                    ("checkOutDate", p.end_date),
                    ("adults", p.number_of_adults.max(1).to_string()),
                ],
            )
            .await?;
        Ok(data["data"].clone())
    }
}
