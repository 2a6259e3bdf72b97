//! Sales record analysis.
//!
//! Parses plain-text transaction records and derives five daily sales
//! metrics: the busiest day by units, the busiest day by value, the best
//! selling product, the best selling staff member, and the day with the
//! highest average hourly volume.

pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod parser;
pub mod types;
