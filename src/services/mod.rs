//! Service layer for the lotto crawler.
//!
//! This module contains the ingestion-side logic for:
//! - Row parsing (`parser`)
//! - Search form postbacks (`FormSession`)
//! - Results page fetching (`ResultsFetcher`)

mod fetcher;
mod form;
pub mod parser;

pub use fetcher::{DrawSource, ResultsFetcher, extract_rows};
pub use form::{FormSession, FormTokens};
