//! Prometheus metrics for core components.
//!
//! The server crate registers these into its registry; recording works
//! either way.

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

/// Tickets created successfully.
pub static TICKETS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("helpdesk_tickets_created_total", "Total tickets created").unwrap()
});

/// Classification outcomes by result.
pub static CLASSIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_classifications_total",
            "Classification attempts by outcome",
        ),
        // "ok", "disabled", "empty", "timeout", "transport", "api",
        // "malformed", "out_of_enum"
        &["result"],
    )
    .unwrap()
});
