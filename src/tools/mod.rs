//! 工具层：Tool trait 与目录、执行器（超时 + 审计）、Schema 生成，以及行程规划用到的外部查询工具

pub mod amadeus;
pub mod calendar;
pub mod datetime;
pub mod executor;
pub mod location;
pub mod registry;
pub mod schema;
pub mod ticketmaster;

pub use amadeus::{AmadeusClient, AmadeusHotelListTool, AmadeusHotelOffersTool, AMADEUS_BASE_URL};
pub use calendar::{FreeBusyTool, GoogleCalendarClient, ListEventsTool, GOOGLE_CALENDAR_BASE_URL};
pub use executor::ToolExecutor;
pub use location::LocationCoordinatesTool;
pub use registry::{Tool, ToolRegistry};
pub use schema::{parameters_for, parse_args, OutputSchema};
pub use ticketmaster::{TicketmasterEventsTool, TICKETMASTER_BASE_URL};
