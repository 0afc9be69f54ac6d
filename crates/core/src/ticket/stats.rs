//! Aggregated ticket statistics.
//!
//! All counts come from the store's grouped query surface (COUNT / GROUP
//! BY); nothing here ever materializes the ticket rows. Cost stays
//! proportional to the number of distinct groups, not the number of
//! tickets.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Priority, Status, TicketError, TicketFilter, TicketStore};

/// Summary statistics over the full ticket population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketStats {
    pub total_tickets: u64,
    /// Tickets with status `open`.
    pub open_tickets: u64,
    /// `total / max(1, whole days since the earliest ticket)`, rounded to
    /// one decimal place. `0.0` when the store is empty.
    pub avg_tickets_per_day: f64,
    /// Count per priority; every enum member is present, zero-filled.
    pub priority_breakdown: BTreeMap<Priority, u64>,
    /// Count per category; every enum member is present, zero-filled.
    pub category_breakdown: BTreeMap<Category, u64>,
}

/// Computes [`TicketStats`] on top of a [`TicketStore`].
///
/// Stats are global by design: no filter is applied beyond the `open`
/// status count.
pub struct StatsAggregator {
    store: Arc<dyn TicketStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Compute stats as of now.
    pub fn compute(&self) -> Result<TicketStats, TicketError> {
        self.compute_at(Utc::now())
    }

    /// Compute stats as of an explicit instant (deterministic for tests).
    pub fn compute_at(&self, now: DateTime<Utc>) -> Result<TicketStats, TicketError> {
        let total_tickets = self.store.count(&TicketFilter::new())?;
        let open_tickets = self
            .store
            .count(&TicketFilter::new().with_status(Status::Open))?;

        let mut priority_breakdown: BTreeMap<Priority, u64> =
            Priority::ALL.iter().map(|p| (*p, 0)).collect();
        for (priority, count) in self.store.count_by_priority()? {
            priority_breakdown.insert(priority, count);
        }

        let mut category_breakdown: BTreeMap<Category, u64> =
            Category::ALL.iter().map(|c| (*c, 0)).collect();
        for (category, count) in self.store.count_by_category()? {
            category_breakdown.insert(category, count);
        }

        let avg_tickets_per_day = if total_tickets == 0 {
            0.0
        } else {
            let days_span = self
                .store
                .earliest_created_at()?
                .map(|earliest| (now - earliest).num_days().max(1))
                .unwrap_or(1);
            round1(total_tickets as f64 / days_span as f64)
        };

        Ok(TicketStats {
            total_tickets,
            open_tickets,
            avg_tickets_per_day,
            priority_breakdown,
            category_breakdown,
        })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
