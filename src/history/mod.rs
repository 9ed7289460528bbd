//! Historical readings from the InfluxDB 1.x HTTP query API.
mod parsing;
mod query;

pub use query::InfluxHistory;
