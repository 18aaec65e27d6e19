use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::pipeline::SyncOutcome;
use crate::storage::ResultFilter;

use super::types::{
    ApiFailure, ApiResult, DrawQuery, ResultView, RouterState, err_response, ok_value,
};

pub(super) async fn health() -> ApiResult {
    ok_value(json!({"status": "ok"}))
}

pub(super) async fn results(
    State(state): State<RouterState>,
    Query(query): Query<DrawQuery>,
) -> ApiResult {
    respond(list_results(&state, &query).await)
}

pub(super) async fn heatmap(
    State(state): State<RouterState>,
    Query(query): Query<DrawQuery>,
) -> ApiResult {
    respond(number_heatmap(&state, &query).await)
}

pub(super) async fn game_types(State(state): State<RouterState>) -> ApiResult {
    match state.store.game_types(state.query.game_type_min_draws).await {
        Ok(games) => ok_value(json!(games)),
        Err(e) => store_failure(e),
    }
}

pub(super) async fn sync_status(State(state): State<RouterState>) -> ApiResult {
    ok_value(json!({
        "state": state.coordinator.state(),
        "lastRun": state.coordinator.last_run(),
    }))
}

pub(super) async fn trigger_sync(State(state): State<RouterState>) -> ApiResult {
    // Detached so a client disconnect cannot cancel the run.
    let coordinator = Arc::clone(&state.coordinator);
    let outcome = match tokio::spawn(async move { coordinator.run().await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Sync task ended abnormally: {e}");
            return ApiFailure::internal("sync task ended abnormally").into_response();
        }
    };

    match outcome {
        SyncOutcome::Busy => err_response(
            StatusCode::CONFLICT,
            "busy",
            "a sync run is already in progress",
        ),
        SyncOutcome::Failed { stage, error } => err_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "sync_failed",
            format!("sync failed while {stage}: {error}"),
        ),
        outcome => respond(to_value(&outcome)),
    }
}

async fn list_results(state: &RouterState, query: &DrawQuery) -> Result<Value, ApiFailure> {
    let (from, to) = query.window(state.today(), state.query.results_window_days)?;
    let filter = ResultFilter {
        game_type: query.game_type().map(str::to_string),
        from,
        to,
    };

    let records = state
        .store
        .list_results(&filter)
        .await
        .map_err(|e| internal(&e))?;
    let rows: Vec<ResultView> = records.into_iter().map(ResultView::from).collect();
    to_value(&rows)
}

async fn number_heatmap(state: &RouterState, query: &DrawQuery) -> Result<Value, ApiFailure> {
    let game_type = query
        .game_type()
        .ok_or_else(|| ApiFailure::bad_request("gameType is required"))?;
    let (from, to) = query.window(state.today(), state.query.heatmap_window_days)?;

    let heatmap = state
        .store
        .number_frequency(game_type, from, to)
        .await
        .map_err(|e| internal(&e))?;
    to_value(&heatmap)
}

fn respond(result: Result<Value, ApiFailure>) -> ApiResult {
    match result {
        Ok(value) => ok_value(value),
        Err(failure) => failure.into_response(),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ApiFailure> {
    serde_json::to_value(value).map_err(|e| ApiFailure::internal(e.to_string()))
}

fn internal(error: &dyn std::fmt::Display) -> ApiFailure {
    log::error!("Read query failed: {error}");
    ApiFailure::internal("store query failed")
}

fn store_failure(error: impl std::fmt::Display) -> ApiResult {
    internal(&error).into_response()
}
