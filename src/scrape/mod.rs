//! Scrape payload input
//!
//! Network scraping lives outside this crate; scrape payloads arrive as
//! Prometheus text exposition and are parsed into [`Metric`](crate::transformer::Metric)
//! series here.

pub mod parser;

pub use parser::{parse_exposition, ParseResult};
