//! Connection capability shared by the SQLite backend and the stand-in.
//!
//! # Invariants
//! - `Database` is the only caller of these methods for a bound connection.
//! - `close` consumes the connection; nothing can use it afterwards.

use super::{DbResult, ResultSet, Statement};

/// Live connection bound to one scope.
pub trait Resource: Send {
    fn execute(&mut self, statement: &Statement) -> DbResult<ResultSet>;
    fn commit(&mut self) -> DbResult<()>;
    fn rollback(&mut self) -> DbResult<()>;
    fn close(self: Box<Self>) -> DbResult<()>;
}

/// Creates connections on demand. Shared by every scope of a `Database`.
pub trait ResourceFactory: Send + Sync {
    fn connect(&self) -> DbResult<Box<dyn Resource>>;

    /// Short description of the backing store, used in log events.
    fn location(&self) -> String;
}
