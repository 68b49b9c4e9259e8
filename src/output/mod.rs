//! Result formatting.
//!
//! - [`csv`] - delimited text with a fixed column schema
//! - [`json`] - serde-based JSON
//! - [`terminal`] - colored human-readable summary

pub mod csv;
pub mod json;
pub mod terminal;

pub use csv::CsvOptions;
pub use json::{to_json, to_json_pretty};
pub use terminal::format_result;
