//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use helpdesk_core::metrics::TICKETS_CREATED_TOTAL;
use helpdesk_core::ticket::UnknownValue;
use helpdesk_core::{
    Category, FieldViolation, NewTicket, Priority, Status, Ticket, TicketError, TicketFilter,
    TicketPatch,
};
use tracing::{error, info, warn};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a ticket. Enum fields arrive as strings so
/// that out-of-set values produce a 400 with field detail instead of a
/// generic body rejection.
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    /// Defaults to "open".
    pub status: Option<String>,
}

/// Request body for partially updating a ticket.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

impl UpdateTicketBody {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }
}

/// Query parameters for listing tickets. All optional; present criteria
/// combine with AND.
#[derive(Debug, Default, Deserialize)]
pub struct ListTicketsParams {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Response for ticket operations.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    pub created_at: String,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            category: ticket.category,
            priority: ticket.priority,
            status: ticket.status,
            created_at: ticket.created_at.to_rfc3339(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldViolation>,
}

impl ApiError {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: Vec::new(),
        }
    }

    pub fn validation(fields: Vec<FieldViolation>) -> Self {
        Self {
            error: "validation failed".to_string(),
            fields,
        }
    }
}

pub type ApiErrorResponse = (StatusCode, Json<ApiError>);

/// Map a store error onto the HTTP surface. Validation and NotFound go
/// back to the caller with detail; storage failures are logged in full
/// and surfaced minimally.
pub fn store_error_response(e: TicketError) -> ApiErrorResponse {
    match e {
        TicketError::Validation(violations) => {
            warn!(?violations, "request rejected by ticket invariants");
            (StatusCode::BAD_REQUEST, Json(ApiError::validation(violations)))
        }
        TicketError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::message(format!("ticket not found: {id}"))),
        ),
        TicketError::Database(ref message) => {
            error!(%message, "storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::message("internal error")),
            )
        }
    }
}

/// Parse an enum-valued field, accumulating a violation on failure.
fn parse_field<T>(value: &str, violations: &mut Vec<FieldViolation>) -> Option<T>
where
    T: std::str::FromStr<Err = UnknownValue>,
{
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            violations.push(FieldViolation::new(
                e.field,
                format!("unknown {} value: {}", e.field, e.value),
            ));
            None
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new ticket.
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTicketBody>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiErrorResponse> {
    let mut violations = Vec::new();

    let category = parse_field::<Category>(&body.category, &mut violations);
    let priority = parse_field::<Priority>(&body.priority, &mut violations);
    let status = body
        .status
        .as_deref()
        .and_then(|s| parse_field::<Status>(s, &mut violations));

    if !violations.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation(violations)),
        ));
    }

    let new_ticket = NewTicket {
        title: body.title,
        description: body.description,
        // violations is empty, so both parses succeeded
        category: category.unwrap(),
        priority: priority.unwrap(),
        status,
    };

    let ticket = state
        .ticket_store()
        .create(new_ticket)
        .map_err(store_error_response)?;

    TICKETS_CREATED_TOTAL.inc();
    info!(id = ticket.id, title = %ticket.title, "created ticket");

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

/// Get a ticket by id.
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TicketResponse>, ApiErrorResponse> {
    let ticket = state.ticket_store().get(id).map_err(store_error_response)?;
    Ok(Json(TicketResponse::from(ticket)))
}

/// List tickets, newest first, with optional conjunctive filters.
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<Vec<TicketResponse>>, ApiErrorResponse> {
    let mut violations = Vec::new();
    let mut filter = TicketFilter::new();

    // empty query values impose no constraint
    if let Some(category) = params.category.as_deref().filter(|s| !s.is_empty()) {
        if let Some(category) = parse_field::<Category>(category, &mut violations) {
            filter = filter.with_category(category);
        }
    }
    if let Some(priority) = params.priority.as_deref().filter(|s| !s.is_empty()) {
        if let Some(priority) = parse_field::<Priority>(priority, &mut violations) {
            filter = filter.with_priority(priority);
        }
    }
    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        if let Some(status) = parse_field::<Status>(status, &mut violations) {
            filter = filter.with_status(status);
        }
    }
    if let Some(search) = params.search.filter(|s| !s.is_empty()) {
        filter = filter.with_search(search);
    }

    if !violations.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation(violations)),
        ));
    }

    let tickets = state
        .ticket_store()
        .list(&filter)
        .map_err(store_error_response)?;

    Ok(Json(tickets.into_iter().map(TicketResponse::from).collect()))
}

/// Partially update a ticket (typically a status transition).
pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTicketBody>,
) -> Result<Json<TicketResponse>, ApiErrorResponse> {
    if body.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::message(
                "at least one field must be provided for update",
            )),
        ));
    }

    let mut violations = Vec::new();

    let category = body
        .category
        .as_deref()
        .and_then(|s| parse_field::<Category>(s, &mut violations));
    let priority = body
        .priority
        .as_deref()
        .and_then(|s| parse_field::<Priority>(s, &mut violations));
    let status = body
        .status
        .as_deref()
        .and_then(|s| parse_field::<Status>(s, &mut violations));

    if !violations.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation(violations)),
        ));
    }

    let patch = TicketPatch {
        title: body.title,
        description: body.description,
        category,
        priority,
        status,
    };

    let ticket = state
        .ticket_store()
        .update(id, patch)
        .map_err(store_error_response)?;

    info!(id, status = %ticket.status, "updated ticket");

    Ok(Json(TicketResponse::from(ticket)))
}
