use std::sync::Arc;

use axum::{Json, http::StatusCode};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{DrawRecord, QueryConfig, ScheduleConfig};
use crate::pipeline::SyncCoordinator;
use crate::storage::DrawStore;
use crate::utils::parse_draw_date;

#[derive(Clone)]
pub(super) struct RouterState {
    pub(super) store: Arc<dyn DrawStore>,
    pub(super) coordinator: Arc<SyncCoordinator>,
    pub(super) query: QueryConfig,
    pub(super) schedule: ScheduleConfig,
}

impl RouterState {
    pub(super) fn today(&self) -> NaiveDate {
        self.schedule.today()
    }
}

#[derive(Serialize)]
pub(super) struct ApiResponse {
    pub(super) success: bool,
    pub(super) data: Option<Value>,
    pub(super) error: Option<ApiError>,
}

#[derive(Serialize)]
pub(super) struct ApiError {
    pub(super) code: &'static str,
    pub(super) message: String,
}

pub(super) type ApiResult = (StatusCode, Json<ApiResponse>);

pub(super) fn ok_value(value: Value) -> ApiResult {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(value),
            error: None,
        }),
    )
}

pub(super) fn err_response(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> ApiResult {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }),
    )
}

#[derive(Debug)]
pub(super) struct ApiFailure {
    pub(super) status: StatusCode,
    pub(super) code: &'static str,
    pub(super) message: String,
}

impl ApiFailure {
    pub(super) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }

    pub(super) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: message.into(),
        }
    }

    pub(super) fn into_response(self) -> ApiResult {
        err_response(self.status, self.code, self.message)
    }
}

/// Query string shared by `/results` and `/heatmap`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DrawQuery {
    pub(super) game_type: Option<String>,
    pub(super) draw_date_from: Option<String>,
    pub(super) draw_date_to: Option<String>,
}

impl DrawQuery {
    /// Game type if one was given. Blank values count as absent.
    pub(super) fn game_type(&self) -> Option<&str> {
        self.game_type
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    /// Inclusive date window. A missing `to` is today and a missing `from`
    /// is `window_days` before `to`.
    pub(super) fn window(
        &self,
        today: NaiveDate,
        window_days: u32,
    ) -> Result<(NaiveDate, NaiveDate), ApiFailure> {
        let to = match date_param("drawDateTo", self.draw_date_to.as_deref())? {
            Some(to) => to,
            None => today,
        };
        let from = match date_param("drawDateFrom", self.draw_date_from.as_deref())? {
            Some(from) => from,
            None => to
                .checked_sub_days(Days::new(u64::from(window_days)))
                .unwrap_or(NaiveDate::MIN),
        };

        if from > to {
            return Err(ApiFailure::bad_request(format!(
                "drawDateFrom {from} is after drawDateTo {to}"
            )));
        }
        Ok((from, to))
    }
}

fn date_param(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiFailure> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_draw_date(raw)
            .map(Some)
            .ok_or_else(|| ApiFailure::bad_request(format!("invalid {name} '{raw}'"))),
    }
}

/// One row of the `/results` listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ResultView {
    game_type: String,
    draw_date: NaiveDate,
    jackpot: Decimal,
    winners: u32,
    combination: String,
    numbers: Vec<u32>,
}

impl From<DrawRecord> for ResultView {
    fn from(record: DrawRecord) -> Self {
        Self {
            combination: record.combination(),
            numbers: record.drawn_numbers().collect(),
            game_type: record.game_type,
            draw_date: record.draw_date,
            jackpot: record.jackpot,
            winners: record.winners,
        }
    }
}
