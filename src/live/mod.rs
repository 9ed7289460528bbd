//! Real-time readings from the Home Assistant REST `states` endpoint.
mod parsing;
mod query;

pub use query::HomeAssistant;
