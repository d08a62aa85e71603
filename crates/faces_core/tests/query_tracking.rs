use faces_core::db::{Resource, ResourceFactory};
use faces_core::{
    Database, DbError, DbResult, ResultSet, ScopeToken, Statement, StubFactory, StubResponse,
    TrackerError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn select() -> Statement {
    Statement::new("SELECT name FROM projects")
}

fn insert(name: &str) -> Statement {
    Statement::new("INSERT INTO projects (name) VALUES (?1)").bind(name.to_string())
}

#[test]
fn commit_closes_batch_with_exactly_the_issued_statements() {
    let db = Database::create_null([
        StubResponse::empty(),
        StubResponse::empty(),
        StubResponse::empty(),
    ]);
    let issued = vec![select(), insert("a"), insert("b")];

    for statement in &issued {
        db.execute(statement).unwrap();
    }
    db.commit().unwrap();

    assert_eq!(db.query_tracker().last_batch().unwrap(), issued);
    assert_eq!(db.query_tracker().all_outputs(), issued);
}

#[test]
fn each_finalized_scope_gets_its_own_batch() {
    let db = Database::create_null([StubResponse::empty(), StubResponse::empty()]);

    db.execute(&select()).unwrap();
    db.commit().unwrap();
    db.execute(&insert("a")).unwrap();
    db.rollback().unwrap();

    assert_eq!(
        db.query_tracker().batches(),
        vec![vec![select()], vec![insert("a")]]
    );
}

#[test]
fn finalize_without_binding_is_idempotent_noop() {
    let db = Database::create_null(Vec::<StubResponse>::new());

    db.commit().unwrap();
    db.rollback().unwrap();
    db.commit().unwrap();

    assert_eq!(
        db.query_tracker().last_batch(),
        Err(TrackerError::NoClosedBatch)
    );
    assert!(db.query_tracker().all_outputs().is_empty());
}

#[test]
fn second_finalize_after_commit_adds_no_batch() {
    let db = Database::create_null([StubResponse::empty()]);
    db.execute(&select()).unwrap();

    db.commit().unwrap();
    db.rollback().unwrap();

    assert_eq!(db.query_tracker().batches().len(), 1);
}

#[test]
fn scripted_rows_round_trip_in_order() {
    let db = Database::create_null([StubResponse::rows([
        [("name", "one".to_string())],
        [("name", "two".to_string())],
    ])]);

    let rows = db.execute(&select()).unwrap();

    let names: Vec<_> = rows.iter().filter_map(|row| row.get_text("name")).collect();
    assert_eq!(names, vec!["one", "two"]);
}

#[test]
fn scripted_error_is_raised_after_recording() {
    let db = Database::create_null([StubResponse::Error(DbError::Rejected(
        "not found".to_string(),
    ))]);

    let err = db.execute(&select()).unwrap_err();

    assert!(matches!(err, DbError::Rejected(message) if message == "not found"));
    assert_eq!(db.query_tracker().last_output().unwrap(), select());
}

#[test]
fn running_past_the_script_fails_loudly() {
    let db = Database::create_null([StubResponse::empty()]);
    db.execute(&select()).unwrap();

    let err = db.execute(&select()).unwrap_err();

    assert!(matches!(err, DbError::ScriptExhausted { consumed: 1 }));
}

#[test]
fn concurrent_scopes_bind_independent_stand_ins() {
    let factory = StubFactory::new((0..4).map(|_| StubResponse::empty()));
    let db = Arc::new(Database::new(Arc::new(factory.clone())));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            std::thread::spawn(move || {
                db.execute(&select()).unwrap();
                ScopeToken::current()
            })
        })
        .collect();
    let scopes: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();

    assert_eq!(factory.connections_opened(), 4);
    assert_eq!(db.bound_scopes(), 4);
    for scope in &scopes {
        db.commit_in(scope).unwrap();
    }
    assert_eq!(db.bound_scopes(), 0);
    assert_eq!(db.query_tracker().batches().len(), 4);
}

struct FailingCommitFactory {
    closed: Arc<AtomicUsize>,
}

struct FailingCommit {
    closed: Arc<AtomicUsize>,
}

impl ResourceFactory for FailingCommitFactory {
    fn connect(&self) -> DbResult<Box<dyn Resource>> {
        Ok(Box::new(FailingCommit {
            closed: Arc::clone(&self.closed),
        }))
    }

    fn location(&self) -> String {
        "failing-commit".to_string()
    }
}

impl Resource for FailingCommit {
    fn execute(&mut self, _statement: &Statement) -> DbResult<ResultSet> {
        Ok(ResultSet::empty())
    }

    fn commit(&mut self) -> DbResult<()> {
        Err(DbError::Rejected("disk full".to_string()))
    }

    fn rollback(&mut self) -> DbResult<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn failed_commit_still_unbinds_closes_and_ends_batch() {
    let closed = Arc::new(AtomicUsize::new(0));
    let db = Database::new(Arc::new(FailingCommitFactory {
        closed: Arc::clone(&closed),
    }));
    db.execute(&insert("a")).unwrap();

    let err = db.commit().unwrap_err();

    assert!(matches!(err, DbError::Rejected(message) if message == "disk full"));
    assert!(!db.is_bound(&ScopeToken::current()));
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert_eq!(db.query_tracker().last_batch().unwrap(), vec![insert("a")]);
}
