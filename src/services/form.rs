// src/services/form.rs

//! Postback form session for the results search page.
//!
//! The search page is a server-rendered form: a range query is only accepted
//! when it echoes back the hidden state tokens issued by the page load that
//! preceded it, within the same cookie session. [`FormSession`] keeps that
//! pairing in one place.

use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use scraper::{Html, Selector};

use crate::error::FetchError;
use crate::models::PageSelectors;
use crate::utils::http;

const FIELD_PREFIX: &str = "ctl00$ctl00$cphContainer$cpContent$";

/// Value of the game dropdown that selects every game.
const ALL_GAMES: &str = "0";
const SEARCH_BUTTON: &str = "Search Lotto";

/// Hidden state tokens captured from the search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTokens {
    pub view_state: String,
    pub view_state_generator: String,
    pub event_validation: String,
}

impl FormTokens {
    /// Extract all three tokens from a page. A missing token is a hard failure.
    pub fn from_html(html: &str, selectors: &PageSelectors) -> Result<Self, FetchError> {
        let document = Html::parse_document(html);
        Ok(Self {
            view_state: hidden_value(&document, &selectors.view_state, "__VIEWSTATE")?,
            view_state_generator: hidden_value(
                &document,
                &selectors.view_state_generator,
                "__VIEWSTATEGENERATOR",
            )?,
            event_validation: hidden_value(
                &document,
                &selectors.event_validation,
                "__EVENTVALIDATION",
            )?,
        })
    }

    /// Build the URL-encodable field list for a `from..=to` search.
    pub fn range_form(&self, from: NaiveDate, to: NaiveDate) -> Vec<(String, String)> {
        let control = |name: &str| format!("{FIELD_PREFIX}{name}");
        vec![
            ("__EVENTTARGET".into(), String::new()),
            ("__EVENTARGUMENT".into(), String::new()),
            ("__VIEWSTATE".into(), self.view_state.clone()),
            ("__VIEWSTATEGENERATOR".into(), self.view_state_generator.clone()),
            ("__EVENTVALIDATION".into(), self.event_validation.clone()),
            (control("ddlStartMonth"), month_label(from)),
            (control("ddlStartDate"), from.day().to_string()),
            (control("ddlStartYear"), from.year().to_string()),
            (control("ddlEndMonth"), month_label(to)),
            (control("ddlEndDay"), to.day().to_string()),
            (control("ddlEndYear"), to.year().to_string()),
            (control("ddlSelectGame"), ALL_GAMES.into()),
            (control("btnSearch"), SEARCH_BUTTON.into()),
        ]
    }
}

/// A loaded search page whose tokens can be replayed in a range query.
#[derive(Debug)]
pub struct FormSession {
    client: Client,
    page_url: String,
    tokens: FormTokens,
}

impl FormSession {
    /// Load the search page and capture its state tokens.
    pub async fn load(
        client: &Client,
        page_url: &str,
        selectors: &PageSelectors,
    ) -> Result<Self, FetchError> {
        let html = http::fetch_text(client, page_url).await?;
        let tokens = FormTokens::from_html(&html, selectors)?;
        log::debug!("Captured form state from {page_url}");

        Ok(Self {
            client: client.clone(),
            page_url: page_url.to_string(),
            tokens,
        })
    }

    /// Submit the range query and return the result page body.
    pub async fn search(&self, from: NaiveDate, to: NaiveDate) -> Result<String, FetchError> {
        log::debug!("Posting range search {from}..={to}");
        let fields = self.tokens.range_form(from, to);
        http::post_form(&self.client, &self.page_url, &fields).await
    }
}

/// Compile a CSS selector, reporting failures as a markup mismatch.
pub(crate) fn compile_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector)
        .map_err(|e| FetchError::SchemaChanged(format!("invalid selector '{selector}': {e:?}")))
}

fn hidden_value(document: &Html, selector: &str, field: &str) -> Result<String, FetchError> {
    let sel = compile_selector(selector)?;
    document
        .select(&sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| FetchError::MissingFormState {
            field: field.to_string(),
        })
}

fn month_label(date: NaiveDate) -> String {
    date.format("%B").to_string()
}
