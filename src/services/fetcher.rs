// src/services/fetcher.rs

//! Results page fetcher.
//!
//! Two retrieval modes share one row extractor: a plain GET of the results
//! page for the latest day, and a form postback for a date range.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use scraper::Html;

use crate::error::{FetchError, Result};
use crate::models::{Config, PageSelectors, RawRow};
use crate::services::form::{FormSession, compile_selector};
use crate::utils::{clean_text, http};

/// Cells kept per row; the parser reads exactly this many.
const ROW_WIDTH: usize = 5;

/// Source of raw result rows.
#[async_trait]
pub trait DrawSource: Send + Sync {
    /// Rows currently shown on the results page.
    async fn fetch_latest_day(&self) -> std::result::Result<Vec<RawRow>, FetchError>;

    /// Rows for every draw in `from..=to`.
    async fn fetch_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> std::result::Result<Vec<RawRow>, FetchError>;
}

/// [`DrawSource`] backed by the live results page.
pub struct ResultsFetcher {
    client: Client,
    results_url: String,
    selectors: PageSelectors,
}

impl ResultsFetcher {
    /// Create a fetcher with a client built from the crawler settings.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client(&config.crawler)?,
            results_url: config.crawler.results_url.clone(),
            selectors: config.selectors.clone(),
        })
    }
}

#[async_trait]
impl DrawSource for ResultsFetcher {
    async fn fetch_latest_day(&self) -> std::result::Result<Vec<RawRow>, FetchError> {
        log::info!("Fetching latest results from {}", self.results_url);
        let html = http::fetch_text(&self.client, &self.results_url).await?;
        extract_rows(&html, &self.selectors)
    }

    async fn fetch_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> std::result::Result<Vec<RawRow>, FetchError> {
        log::info!("Fetching results for {from}..={to}");
        let session = FormSession::load(&self.client, &self.results_url, &self.selectors).await?;
        let html = session.search(from, to).await?;
        extract_rows(&html, &self.selectors)
    }
}

/// Extract data rows from the results table, dropping the header row.
///
/// Every other row yields one [`RawRow`], even one with no cells.
pub fn extract_rows(
    html: &str,
    selectors: &PageSelectors,
) -> std::result::Result<Vec<RawRow>, FetchError> {
    let document = Html::parse_document(html);
    let row_sel = compile_selector(&selectors.results_row)?;
    let cell_sel = compile_selector(&selectors.cell)?;

    let mut table_rows = document.select(&row_sel).peekable();
    if table_rows.peek().is_none() {
        return Err(FetchError::SchemaChanged(format!(
            "no rows match '{}'",
            selectors.results_row
        )));
    }

    let rows: Vec<RawRow> = table_rows
        .skip(1)
        .map(|tr| {
            RawRow::new(
                tr.select(&cell_sel)
                    .take(ROW_WIDTH)
                    .map(|td| clean_text(td.text())),
            )
        })
        .collect();

    log::debug!("Extracted {} rows", rows.len());
    Ok(rows)
}
