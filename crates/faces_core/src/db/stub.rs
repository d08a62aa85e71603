//! Scripted stand-in for the SQLite backend.
//!
//! # Responsibility
//! - Replay a pre-configured sequence of results or errors, one per
//!   `execute` call, so callers can be exercised without I/O.
//!
//! # Invariants
//! - Responses are consumed strictly in call order across every connection
//!   created by the same factory.
//! - Running past the end of the script is an error, never an empty result.
//! - `commit`, `rollback` and `close` always succeed.

use super::resource::{Resource, ResourceFactory};
use super::{DbError, DbResult, Record, ResultSet, Statement};
use log::error;
use parking_lot::Mutex;
use rusqlite::types::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One row of a scripted result: column name and value pairs.
pub type FieldMap = Vec<(String, Value)>;

/// One scripted answer to an `execute` call.
#[derive(Debug)]
pub enum StubResponse {
    Rows(Vec<FieldMap>),
    Error(DbError),
}

impl StubResponse {
    /// Builds a `Rows` response from `(column, value)` pairs.
    pub fn rows<R, K, V>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Rows(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(column, value)| (column.into(), value.into()))
                        .collect()
                })
                .collect(),
        )
    }

    /// A successful response with no rows.
    pub fn empty() -> Self {
        Self::Rows(Vec::new())
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<StubResponse>,
    consumed: usize,
}

/// Factory handing out stand-in connections that share one script.
#[derive(Debug, Clone)]
pub struct StubFactory {
    script: Arc<Mutex<Script>>,
    unavailable: Option<String>,
    connections_opened: Arc<AtomicUsize>,
}

impl StubFactory {
    pub fn new(responses: impl IntoIterator<Item = StubResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                responses: responses.into_iter().collect(),
                consumed: 0,
            })),
            unavailable: None,
            connections_opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Factory whose every `connect` fails with `ResourceUnavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::new(Vec::<StubResponse>::new())
        }
    }

    /// Number of scripted responses not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.lock().responses.len()
    }

    /// Number of connections handed out so far.
    pub fn connections_opened(&self) -> usize {
        self.connections_opened.load(Ordering::SeqCst)
    }
}

impl ResourceFactory for StubFactory {
    fn connect(&self) -> DbResult<Box<dyn Resource>> {
        if let Some(reason) = &self.unavailable {
            return Err(DbError::ResourceUnavailable {
                location: self.location(),
                reason: reason.clone(),
            });
        }

        self.connections_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubConnection {
            script: Arc::clone(&self.script),
        }))
    }

    fn location(&self) -> String {
        "stub".to_string()
    }
}

/// Stand-in connection. Holds no transactional state.
pub struct StubConnection {
    script: Arc<Mutex<Script>>,
}

impl Resource for StubConnection {
    fn execute(&mut self, statement: &Statement) -> DbResult<ResultSet> {
        let mut script = self.script.lock();
        let Some(response) = script.responses.pop_front() else {
            error!(
                "event=stub_execute module=db status=error error_code=script_exhausted consumed={} sql={}",
                script.consumed, statement
            );
            return Err(DbError::ScriptExhausted {
                consumed: script.consumed,
            });
        };
        script.consumed += 1;

        match response {
            StubResponse::Error(err) => Err(err),
            StubResponse::Rows(rows) => Ok(rows_to_result(rows)),
        }
    }

    fn commit(&mut self) -> DbResult<()> {
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        Ok(())
    }
}

fn rows_to_result(rows: Vec<FieldMap>) -> ResultSet {
    let Some(first) = rows.first() else {
        return ResultSet::empty();
    };
    let columns: Arc<[String]> = first
        .iter()
        .map(|(column, _)| column.clone())
        .collect::<Vec<_>>()
        .into();

    let records = rows
        .into_iter()
        .map(|mut row| {
            let values = columns
                .iter()
                .map(|column| {
                    row.iter()
                        .position(|(name, _)| name == column)
                        .map(|index| row.swap_remove(index).1)
                        .unwrap_or(Value::Null)
                })
                .collect();
            Record::new(Arc::clone(&columns), values)
        })
        .collect();

    ResultSet::new(records)
}

#[cfg(test)]
mod tests {
    use super::{StubFactory, StubResponse};
    use crate::db::{DbError, ResourceFactory, Statement};
    use rusqlite::types::Value;

    fn select() -> Statement {
        Statement::new("SELECT name FROM projects")
    }

    #[test]
    fn rows_come_back_in_scripted_order() {
        let factory = StubFactory::new([StubResponse::rows([
            [("name", "one".to_string())],
            [("name", "two".to_string())],
        ])]);
        let mut conn = factory.connect().unwrap();

        let names: Vec<_> = conn
            .execute(&select())
            .unwrap()
            .into_iter()
            .map(|record| record.get_text("name").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn columns_follow_first_row_keys() {
        let factory = StubFactory::new([StubResponse::Rows(vec![
            vec![
                ("name".to_string(), Value::Text("a".into())),
                ("id".to_string(), Value::Integer(1)),
            ],
            vec![("id".to_string(), Value::Integer(2))],
        ])]);
        let mut conn = factory.connect().unwrap();

        let rows = conn.execute(&select()).unwrap();
        let rows: Vec<_> = rows.into_iter().collect();
        assert_eq!(rows[0].columns(), &["name".to_string(), "id".to_string()]);
        assert_eq!(rows[1].get("name"), Some(&Value::Null));
        assert_eq!(rows[1].get("id"), Some(&Value::Integer(2)));
    }

    #[test]
    fn empty_rows_yield_empty_result() {
        let factory = StubFactory::new([StubResponse::empty()]);
        let mut conn = factory.connect().unwrap();

        assert!(conn.execute(&select()).unwrap().is_empty());
    }

    #[test]
    fn scripted_error_is_returned() {
        let factory = StubFactory::new([StubResponse::Error(DbError::SchemaMissing(
            "no such table: projects".to_string(),
        ))]);
        let mut conn = factory.connect().unwrap();

        let err = conn.execute(&select()).unwrap_err();
        assert!(matches!(err, DbError::SchemaMissing(message) if message == "no such table: projects"));
    }

    #[test]
    fn exhausted_script_fails_loudly() {
        let factory = StubFactory::new([StubResponse::empty()]);
        let mut conn = factory.connect().unwrap();
        conn.execute(&select()).unwrap();

        let err = conn.execute(&select()).unwrap_err();
        assert!(matches!(err, DbError::ScriptExhausted { consumed: 1 }));
    }

    #[test]
    fn connections_share_one_script() {
        let factory = StubFactory::new([
            StubResponse::rows([[("name", "first".to_string())]]),
            StubResponse::rows([[("name", "second".to_string())]]),
        ]);

        let mut a = factory.connect().unwrap();
        let mut b = factory.connect().unwrap();
        let first = a.execute(&select()).unwrap();
        let second = b.execute(&select()).unwrap();

        assert_eq!(first.iter().next().unwrap().get_text("name"), Some("first"));
        assert_eq!(second.iter().next().unwrap().get_text("name"), Some("second"));
        assert_eq!(factory.remaining(), 0);
        assert_eq!(factory.connections_opened(), 2);
    }

    #[test]
    fn finalize_always_succeeds() {
        let factory = StubFactory::new(Vec::<StubResponse>::new());
        let mut conn = factory.connect().unwrap();

        conn.commit().unwrap();
        conn.rollback().unwrap();
        conn.close().unwrap();
    }

    #[test]
    fn unavailable_factory_refuses_connections() {
        let factory = StubFactory::unavailable("disk offline");

        let err = factory.connect().err().unwrap();
        assert!(matches!(err, DbError::ResourceUnavailable { reason, .. } if reason == "disk offline"));
        assert_eq!(factory.connections_opened(), 0);
    }
}
