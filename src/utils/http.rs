// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::REFERER;

use crate::error::{FetchError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
///
/// The client keeps a cookie store so a form postback replays the session
/// opened by the preceding page load.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_store(true)
        .build()
        .map_err(FetchError::from)?;
    Ok(client)
}

/// GET a page and return its body, treating non-2xx statuses as failures.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
) -> std::result::Result<String, FetchError> {
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}

/// POST a URL-encoded form back to the page it came from.
pub async fn post_form(
    client: &reqwest::Client,
    url: &str,
    fields: &[(String, String)],
) -> std::result::Result<String, FetchError> {
    let text = client
        .post(url)
        .header(REFERER, url)
        .form(fields)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}
