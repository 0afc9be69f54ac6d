//! Aggregated statistics endpoint.

use axum::{extract::State, Json};
use std::sync::Arc;

use helpdesk_core::TicketStats;

use super::tickets::{store_error_response, ApiErrorResponse};
use crate::state::AppState;

/// Global ticket statistics, computed with grouped queries only.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TicketStats>, ApiErrorResponse> {
    let stats = state.stats().compute().map_err(store_error_response)?;
    Ok(Json(stats))
}
