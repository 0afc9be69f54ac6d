//! Advisory classification endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use helpdesk_core::{Category, Priority};
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClassifyBody {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub suggested_category: Category,
    pub suggested_priority: Priority,
}

#[derive(Debug, Serialize)]
pub struct ClassifyErrorResponse {
    pub error: String,
    pub detail: String,
}

/// Suggest a (category, priority) pair for a description.
///
/// Any degradation of the provider (disabled, timeout, malformed or
/// out-of-enum response, transport failure) is a 503: the client falls
/// back to manual selection and ticket submission is unaffected.
pub async fn classify_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClassifyBody>,
) -> Result<Json<ClassifyResponse>, (StatusCode, Json<ClassifyErrorResponse>)> {
    match state.classifier().classify(&body.description).await {
        Some(suggestion) => Ok(Json(ClassifyResponse {
            suggested_category: suggestion.category,
            suggested_priority: suggestion.priority,
        })),
        None => {
            warn!("classification unavailable");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ClassifyErrorResponse {
                    error: "classification service unavailable".to_string(),
                    detail: "unable to classify the ticket at this time; \
                             please select category and priority manually"
                        .to_string(),
                }),
            ))
        }
    }
}
