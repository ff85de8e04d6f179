//! 行程：数据模型与基于 Agent 循环的生成器

pub mod generator;
pub mod models;

pub use generator::{ideas_prompt, ItineraryPlanner, TravelServices};
pub use models::{
    Accommodation, Activity, ActivityRequest, Coordinates, Destination, DestinationRequest, Itinerary,
    ItineraryRequest, Prompt, PromptsList, Transportation,
};
