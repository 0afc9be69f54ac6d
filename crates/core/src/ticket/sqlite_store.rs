//! SQLite-backed ticket store implementation.
//!
//! All invariants live in the write path itself: `create` and `update`
//! validate the full record before committing, and the schema carries
//! matching CHECK constraints so not even a raw SQL caller can persist
//! an invalid row.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use tracing::debug;

use super::{
    validate_text_fields, Category, NewTicket, Priority, Status, Ticket, TicketError,
    TicketFilter, TicketPatch, TicketStore,
};

const TICKET_COLUMNS: &str = "id, title, description, category, priority, status, created_at";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Open (or create) the database file and initialize the schema.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL
                    CHECK(length(title) > 0 AND length(title) <= 200),
                description TEXT NOT NULL
                    CHECK(length(description) > 0),
                category TEXT NOT NULL
                    CHECK(category IN ('billing', 'technical', 'account', 'general')),
                priority TEXT NOT NULL
                    CHECK(priority IN ('low', 'medium', 'high', 'critical')),
                status TEXT NOT NULL DEFAULT 'open'
                    CHECK(status IN ('open', 'in_progress', 'resolved', 'closed')),
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_tickets_category ON tickets(category);
            CREATE INDEX IF NOT EXISTS idx_tickets_status_priority ON tickets(status, priority);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category) = filter.category {
            conditions.push("category = ?".to_string());
            params.push(Box::new(category.as_str()));
        }

        if let Some(priority) = filter.priority {
            conditions.push("priority = ?".to_string());
            params.push(Box::new(priority.as_str()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?".to_string());
            params.push(Box::new(status.as_str()));
        }

        if let Some(ref search) = filter.search {
            // SQLite LIKE is case-insensitive for ASCII, which matches the
            // case-insensitive substring contract.
            let pattern = format!("%{}%", escape_like(search));
            conditions.push(
                r"(title LIKE ? ESCAPE '\' OR description LIKE ? ESCAPE '\')".to_string(),
            );
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let id: i64 = row.get(0)?;
        let title: String = row.get(1)?;
        let description: String = row.get(2)?;
        let category_str: String = row.get(3)?;
        let priority_str: String = row.get(4)?;
        let status_str: String = row.get(5)?;
        let created_at_str: String = row.get(6)?;

        let category: Category = category_str
            .parse()
            .map_err(|e| conversion_err(3, e))?;
        let priority: Priority = priority_str
            .parse()
            .map_err(|e| conversion_err(4, e))?;
        let status: Status = status_str.parse().map_err(|e| conversion_err(5, e))?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_err(6, e))?;

        Ok(Ticket {
            id,
            title,
            description,
            category,
            priority,
            status,
            created_at,
        })
    }

    /// Creation timestamp for a new row: wall clock time, clamped so that
    /// `created_at` never decreases with insertion order even if the
    /// system clock steps backwards.
    fn next_created_at(tx: &rusqlite::Transaction) -> Result<DateTime<Utc>, TicketError> {
        let latest: Option<String> = tx
            .query_row("SELECT MAX(created_at) FROM tickets", [], |row| row.get(0))
            .map_err(db_err)?;

        // Truncate to the stored microsecond precision so that the value
        // we return equals the value a later read will produce.
        let now = DateTime::parse_from_rfc3339(&encode_timestamp(Utc::now()))
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(db_err)?;

        let clamped = latest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|prev| prev.with_timezone(&Utc))
            .map_or(now, |prev| now.max(prev));

        Ok(clamped)
    }
}

fn db_err(e: impl std::fmt::Display) -> TicketError {
    TicketError::Database(e.to_string())
}

fn conversion_err(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

/// Escape LIKE wildcards in user-supplied search text.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Fixed-width RFC 3339 so that lexicographic TEXT ordering in SQLite is
/// chronological ordering.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl TicketStore for SqliteTicketStore {
    fn create(&self, ticket: NewTicket) -> Result<Ticket, TicketError> {
        let title = ticket.title.trim().to_string();
        let description = ticket.description.trim().to_string();

        let violations = validate_text_fields(&title, &description);
        if !violations.is_empty() {
            return Err(TicketError::Validation(violations));
        }

        let status = ticket.status.unwrap_or(Status::Open);

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let created_at = Self::next_created_at(&tx)?;

        tx.execute(
            "INSERT INTO tickets (title, description, category, priority, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                title,
                description,
                ticket.category.as_str(),
                ticket.priority.as_str(),
                status.as_str(),
                encode_timestamp(created_at),
            ],
        )
        .map_err(db_err)?;

        let id = tx.last_insert_rowid();
        tx.commit().map_err(db_err)?;

        debug!(id, %title, "ticket created");

        Ok(Ticket {
            id,
            title,
            description,
            category: ticket.category,
            priority: ticket.priority,
            status,
            created_at,
        })
    }

    fn get(&self, id: i64) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?"),
            params![id],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(ticket),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(TicketError::NotFound(id)),
            Err(e) => Err(db_err(e)),
        }
    }

    fn update(&self, id: i64, patch: TicketPatch) -> Result<Ticket, TicketError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        // Read-modify-write against the latest committed version; the
        // connection mutex serializes concurrent writers.
        let current = tx.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?"),
            params![id],
            Self::row_to_ticket,
        );

        let current = match current {
            Ok(ticket) => ticket,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(TicketError::NotFound(id)),
            Err(e) => return Err(db_err(e)),
        };

        let merged = Ticket {
            id: current.id,
            title: patch
                .title
                .map_or(current.title, |t| t.trim().to_string()),
            description: patch
                .description
                .map_or(current.description, |d| d.trim().to_string()),
            category: patch.category.unwrap_or(current.category),
            priority: patch.priority.unwrap_or(current.priority),
            status: patch.status.unwrap_or(current.status),
            created_at: current.created_at,
        };

        let violations = validate_text_fields(&merged.title, &merged.description);
        if !violations.is_empty() {
            return Err(TicketError::Validation(violations));
        }

        tx.execute(
            "UPDATE tickets
             SET title = ?, description = ?, category = ?, priority = ?, status = ?
             WHERE id = ?",
            params![
                merged.title,
                merged.description,
                merged.category.as_str(),
                merged.priority.as_str(),
                merged.status.as_str(),
                id,
            ],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;

        debug!(id, status = %merged.status, "ticket updated");

        Ok(merged)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets {} ORDER BY created_at DESC, id DESC",
            where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(db_err)?;

        let mut tickets = Vec::new();
        for row_result in rows {
            tickets.push(row_result.map_err(db_err)?);
        }

        Ok(tickets)
    }

    fn count(&self, filter: &TicketFilter) -> Result<u64, TicketError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)?;

        Ok(count as u64)
    }

    fn count_by_category(&self) -> Result<Vec<(Category, u64)>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT category, COUNT(*) FROM tickets GROUP BY category")
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| {
                let category: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                let category: Category =
                    category.parse().map_err(|e| conversion_err(0, e))?;
                Ok((category, count as u64))
            })
            .map_err(db_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn count_by_priority(&self) -> Result<Vec<(Priority, u64)>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT priority, COUNT(*) FROM tickets GROUP BY priority")
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| {
                let priority: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                let priority: Priority =
                    priority.parse().map_err(|e| conversion_err(0, e))?;
                Ok((priority, count as u64))
            })
            .map_err(db_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn earliest_created_at(&self) -> Result<Option<DateTime<Utc>>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let earliest: Option<String> = conn
            .query_row("SELECT MIN(created_at) FROM tickets", [], |row| row.get(0))
            .map_err(db_err)?;

        earliest
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(db_err)
            })
            .transpose()
    }
}
