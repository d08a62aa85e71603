//! Scoped database access for Faces core.
//!
//! # Responsibility
//! - Bind at most one live connection per logical scope and finalize it on
//!   command (`Database`).
//! - Define the connection capability (`Resource`) and its two backends:
//!   SQLite and the scripted stand-in.
//!
//! # Invariants
//! - A connection is never shared across two scopes.
//! - A connection never outlives the finalize call that unbinds it.
//! - Statements and rows are forwarded, never interpreted.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod manager;
pub mod resource;
mod scope;
pub mod sqlite;
mod statement;
pub mod stub;

pub use manager::Database;
pub use resource::{Resource, ResourceFactory};
pub use scope::ScopeToken;
pub use statement::{Record, ResultSet, Statement};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// A new connection could not be created for the scope.
    ResourceUnavailable { location: String, reason: String },
    /// The statement referenced a table that does not exist.
    SchemaMissing(String),
    /// The connection rejected the statement for a non-SQLite reason.
    Rejected(String),
    Sqlite(rusqlite::Error),
    /// A stand-in connection was asked for more responses than scripted.
    ScriptExhausted { consumed: usize },
}

impl DbError {
    /// Returns `true` for the missing-schema condition callers branch on.
    pub fn is_schema_missing(&self) -> bool {
        matches!(self, Self::SchemaMissing(_))
    }

    /// Returns `true` when a bound connection rejected an operation.
    pub fn is_operation_failure(&self) -> bool {
        matches!(
            self,
            Self::SchemaMissing(_) | Self::Rejected(_) | Self::Sqlite(_)
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceUnavailable { location, reason } => {
                write!(f, "database `{location}` is unavailable: {reason}")
            }
            Self::SchemaMissing(message) => write!(f, "schema missing: {message}"),
            Self::Rejected(message) => write!(f, "operation rejected: {message}"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::ScriptExhausted { consumed } => write!(
                f,
                "stub database script exhausted after {consumed} response(s)"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(_, Some(message))
                if message.starts_with("no such table") =>
            {
                Self::SchemaMissing(message.clone())
            }
            _ => Self::Sqlite(value),
        }
    }
}
