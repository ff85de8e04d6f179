//! 行程数据模型：最终答案（Itinerary）、中间请求（ItineraryRequest）、出行灵感（PromptsList）与坐标
//!
//! 所有类型同时派生 serde 与 schemars：字段文档即模型看到的字段描述，声明顺序即 Schema 字段顺序。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A hotel stay at one destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Accommodation {
    /// Name of the hotel
    pub name: String,
    /// Address of the hotel
    pub address: String,
    /// Check-in date in ISO 8601 format
    pub check_in: String,
    /// Check-out date in ISO 8601 format
    pub check_out: String,
    /// Hotel ID
    pub hotel_id: String,
    /// Hotel offer ID
    pub hotel_offer_id: String,
    /// Total price for the stay
    pub price_total: String,
    /// Currency of the price
    pub currency: String,
    /// URL of the hotel image
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Activity {
    pub activity_id: String,
    pub name: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub purchase_url: String,
    pub notes: String,
    /// URL of the activity image
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transportation {
    #[serde(rename = "type")]
    pub kind: String,
    pub provider: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Destination {
    pub location: String,
    /// Latitude of the destination
    pub latitude: f64,
    /// Longitude of the destination
    pub longitude: f64,
    pub arrival_date: String,
    pub departure_date: String,
    pub accommodation: Accommodation,
    pub activities: Vec<Activity>,
    pub transportation: Vec<Transportation>,
    /// URL of the destination map image
    pub map_image_url: String,
}

/// A complete trip itinerary with destinations, stays, activities and transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Itinerary {
    pub trip_id: String,
    pub user_id: String,
    pub trip_name: String,
    pub start_date: String,
    pub end_date: String,
    pub destinations: Vec<Destination>,
    pub notes: String,
    pub number_of_adults: u32,
    pub number_of_children: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DestinationRequest {
    pub location: String,
    /// Latitude of the destination
    pub latitude: f64,
    /// Longitude of the destination
    pub longitude: f64,
    pub activities: Vec<ActivityRequest>,
}

/// Trip parameters extracted from a free-form travel idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItineraryRequest {
    pub start_date: String,
    pub end_date: String,
    pub destinations: Vec<DestinationRequest>,
    pub number_of_adults: u32,
    pub number_of_children: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Prompt {
    pub text: String,
}

/// A list of suggested outing ideas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PromptsList {
    pub prompts: Vec<Prompt>,
    /// Creation date in ISO 8601 format
    pub created_at: String,
    pub description: String,
}

/// Latitude and longitude of a described location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    /// Description of the location
    pub location: String,
    /// Latitude of the location
    pub latitude: f64,
    /// Longitude of the location
    pub longitude: f64,
}
