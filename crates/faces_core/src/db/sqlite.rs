//! SQLite-backed connections.
//!
//! # Responsibility
//! - Open and configure SQLite connections on demand.
//! - Run statements and collect rows with their column names.
//!
//! # Invariants
//! - Writes open a transaction lazily; it stays pending until `commit` or
//!   `rollback`. Reads outside a transaction do not hold a snapshot.
//! - Returned connections have `foreign_keys=ON` and a busy timeout.

use super::resource::{Resource, ResourceFactory};
use super::{DbError, DbResult, Record, ResultSet, Statement};
use crate::config::{DatabaseConfig, DbLocation};
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Opens one SQLite connection per scope.
#[derive(Debug, Clone)]
pub struct SqliteFactory {
    location: DbLocation,
    busy_timeout: Duration,
}

impl SqliteFactory {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            location: config.location.clone(),
            busy_timeout: config.busy_timeout,
        }
    }
}

impl ResourceFactory for SqliteFactory {
    fn connect(&self) -> DbResult<Box<dyn Resource>> {
        let started_at = Instant::now();
        let (mode, opened) = match &self.location {
            DbLocation::File(path) => ("file", Connection::open(path)),
            DbLocation::Memory => ("memory", Connection::open_in_memory()),
        };

        let conn = opened.and_then(|conn| {
            configure_connection(&conn, self.busy_timeout)?;
            Ok(conn)
        });

        match conn {
            Ok(conn) => {
                debug!(
                    "event=db_connect module=db status=ok mode={} duration_ms={}",
                    mode,
                    started_at.elapsed().as_millis()
                );
                Ok(Box::new(SqliteConnection { conn }))
            }
            Err(err) => {
                error!(
                    "event=db_connect module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                    mode,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(DbError::ResourceUnavailable {
                    location: self.location.describe(),
                    reason: err.to_string(),
                })
            }
        }
    }

    fn location(&self) -> String {
        self.location.describe()
    }
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

/// Live SQLite connection bound to one scope.
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

impl Resource for SqliteConnection {
    fn execute(&mut self, statement: &Statement) -> DbResult<ResultSet> {
        let mut stmt = self.conn.prepare(statement.sql())?;

        if !stmt.readonly() && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN DEFERRED;")?;
        }

        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(statement.params()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..width)
                .map(|index| row.get::<_, Value>(index))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            records.push(Record::new(Arc::clone(&columns), values));
        }

        Ok(ResultSet::new(records))
    }

    fn commit(&mut self) -> DbResult<()> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT;")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        self.conn.close().map_err(|(_, err)| {
            error!(
                "event=db_close module=db status=error error_code=db_close_failed error={}",
                err
            );
            DbError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteFactory;
    use crate::config::DatabaseConfig;
    use crate::db::{DbError, ResourceFactory, Statement};
    use rusqlite::types::Value;

    #[test]
    fn executes_statements_on_one_connection() {
        let factory = SqliteFactory::new(&DatabaseConfig::in_memory());
        let mut conn = factory.connect().unwrap();

        conn.execute(&Statement::new("CREATE TABLE the_table (foo TEXT)"))
            .unwrap();
        let insert = Statement::new("INSERT INTO the_table (foo) VALUES (?1)").bind("bar".to_string());
        conn.execute(&insert).unwrap();
        let rows = conn
            .execute(&Statement::new("SELECT foo FROM the_table"))
            .unwrap();

        assert_eq!(rows.len(), 1);
        let row = rows.iter().next().unwrap();
        assert_eq!(row.columns(), &["foo".to_string()]);
        assert_eq!(row.get("foo"), Some(&Value::Text("bar".to_string())));
    }

    #[test]
    fn rollback_discards_pending_writes() {
        let factory = SqliteFactory::new(&DatabaseConfig::in_memory());
        let mut conn = factory.connect().unwrap();
        conn.execute(&Statement::new("CREATE TABLE the_table (foo TEXT)"))
            .unwrap();
        conn.commit().unwrap();

        conn.execute(&Statement::new("INSERT INTO the_table (foo) VALUES ('bar')"))
            .unwrap();
        conn.rollback().unwrap();

        let rows = conn
            .execute(&Statement::new("SELECT foo FROM the_table"))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn finalize_without_transaction_is_noop() {
        let factory = SqliteFactory::new(&DatabaseConfig::in_memory());
        let mut conn = factory.connect().unwrap();

        conn.commit().unwrap();
        conn.rollback().unwrap();
        conn.close().unwrap();
    }

    #[test]
    fn missing_table_is_reported_as_schema_missing() {
        let factory = SqliteFactory::new(&DatabaseConfig::in_memory());
        let mut conn = factory.connect().unwrap();

        let err = conn
            .execute(&Statement::new("SELECT name FROM projects"))
            .unwrap_err();
        assert!(matches!(err, DbError::SchemaMissing(_)));
    }

    #[test]
    fn unopenable_file_is_resource_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("faces.db");
        let factory = SqliteFactory::new(&DatabaseConfig::file(&path));

        let err = factory.connect().err().unwrap();
        assert!(matches!(err, DbError::ResourceUnavailable { .. }));
    }
}
