// src/models/selectors.rs

//! CSS selectors for scraping the lotto results page.

use serde::{Deserialize, Serialize};

/// CSS selectors for the results table and the hidden postback fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSelectors {
    /// Selector for every row of the results table, header included
    #[serde(default = "defaults::results_row")]
    pub results_row: String,

    /// Selector for a data cell within a row
    #[serde(default = "defaults::cell")]
    pub cell: String,

    /// Hidden input carrying the serialized view state
    #[serde(default = "defaults::view_state")]
    pub view_state: String,

    /// Hidden input carrying the view state generator id
    #[serde(default = "defaults::view_state_generator")]
    pub view_state_generator: String,

    /// Hidden input carrying the event validation blob
    #[serde(default = "defaults::event_validation")]
    pub event_validation: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            results_row: defaults::results_row(),
            cell: defaults::cell(),
            view_state: defaults::view_state(),
            view_state_generator: defaults::view_state_generator(),
            event_validation: defaults::event_validation(),
        }
    }
}

impl PageSelectors {
    /// All selectors paired with their config key, for validation.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("selectors.results_row", &self.results_row),
            ("selectors.cell", &self.cell),
            ("selectors.view_state", &self.view_state),
            ("selectors.view_state_generator", &self.view_state_generator),
            ("selectors.event_validation", &self.event_validation),
        ]
    }
}

mod defaults {
    pub fn results_row() -> String {
        "table#cphContainer_cpContent_GridView1 tr".into()
    }
    pub fn cell() -> String {
        "td".into()
    }
    pub fn view_state() -> String {
        "input#__VIEWSTATE".into()
    }
    pub fn view_state_generator() -> String {
        "input#__VIEWSTATEGENERATOR".into()
    }
    pub fn event_validation() -> String {
        "input#__EVENTVALIDATION".into()
    }
}
