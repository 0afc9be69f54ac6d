//! Ticket domain: record types, storage, filtering, and aggregation.

mod sqlite_store;
mod stats;
mod store;
mod types;

pub use sqlite_store::SqliteTicketStore;
pub use stats::{StatsAggregator, TicketStats};
pub use store::{TicketError, TicketStore};
pub use types::{
    Category, FieldViolation, NewTicket, Priority, Status, Ticket, TicketFilter, TicketPatch,
    UnknownValue, MAX_TITLE_LEN,
};

pub(crate) use types::validate_text_fields;
