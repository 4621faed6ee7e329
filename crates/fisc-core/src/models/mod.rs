//! Data models shared across extraction and aggregation.

pub mod config;
pub mod period;
pub mod record;
pub mod schema;
