// src/models/mod.rs

//! Domain models for the lotto crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod draw;
mod selectors;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, QueryConfig, ScheduleConfig, ServerConfig, StorageConfig,
};
pub use draw::{DrawRecord, NUMBER_SLOTS, RawRow, number_frequency};
pub use selectors::PageSelectors;
