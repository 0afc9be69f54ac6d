//! Ticket storage trait and error type.

use chrono::{DateTime, Utc};

use crate::ticket::{
    Category, FieldViolation, NewTicket, Priority, Ticket, TicketFilter, TicketPatch,
};

/// Error type for ticket operations.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    /// One or more fields violate the ticket invariants. The write was not
    /// applied.
    #[error("validation failed: {}", format_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// No ticket with the given id.
    #[error("ticket not found: {0}")]
    NotFound(i64),

    /// Storage-layer failure unrelated to input validity.
    #[error("database error: {0}")]
    Database(String),
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Trait for ticket storage backends.
///
/// The store is the sole enforcer of the record invariants: every write
/// path validates the full resulting record before committing, so no
/// caller can persist an invalid ticket.
pub trait TicketStore: Send + Sync {
    /// Validate and persist a new ticket, assigning `id` and `created_at`.
    ///
    /// Atomic: on a `Validation` error nothing is written.
    fn create(&self, ticket: NewTicket) -> Result<Ticket, TicketError>;

    /// Fetch a ticket by id.
    fn get(&self, id: i64) -> Result<Ticket, TicketError>;

    /// Merge `patch` onto the stored ticket, re-validate the merged record
    /// under the same invariants as [`create`](TicketStore::create), and
    /// persist it. `id` and `created_at` are never modified.
    fn update(&self, id: i64, patch: TicketPatch) -> Result<Ticket, TicketError>;

    /// List tickets matching the filter, newest first
    /// (`created_at` descending, ties broken by `id` descending).
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter with a single `COUNT(*)`.
    fn count(&self, filter: &TicketFilter) -> Result<u64, TicketError>;

    /// Per-category counts via one grouped query. Categories with no
    /// tickets are absent from the result.
    fn count_by_category(&self) -> Result<Vec<(Category, u64)>, TicketError>;

    /// Per-priority counts via one grouped query.
    fn count_by_priority(&self) -> Result<Vec<(Priority, u64)>, TicketError>;

    /// `created_at` of the earliest ticket, if any.
    fn earliest_created_at(&self) -> Result<Option<DateTime<Utc>>, TicketError>;
}
