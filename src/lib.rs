pub mod common;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod storage;

pub use common::error::{ParseError, Result, ScraperError, StoreError};
pub use config::Config;
