//! Per-scope connection manager.
//!
//! # Responsibility
//! - Lazily bind one connection per `ScopeToken` and reuse it for every
//!   statement issued in that scope.
//! - Finalize (commit or rollback), close and unbind the connection on
//!   command, closing the current query batch.
//! - Record every statement it is asked to run.
//!
//! # Invariants
//! - The binding table is keyed by scope token only; there is no shared
//!   "current connection" slot.
//! - The table lock is never held while calling into a connection or the
//!   factory.
//! - Unbinding happens after the connection's commit/rollback returns,
//!   whether it succeeded or not.
//! - Failed statements are not rolled back implicitly.

use super::resource::{Resource, ResourceFactory};
use super::scope::ScopeToken;
use super::sqlite::SqliteFactory;
use super::stub::{StubFactory, StubResponse};
use super::{DbResult, ResultSet, Statement};
use crate::config::DatabaseConfig;
use crate::lifecycle::LifecycleHub;
use crate::support::output_tracker::OutputTracker;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

type Handle = Arc<Mutex<Box<dyn Resource>>>;

#[derive(Debug, Clone, Copy)]
enum Finalize {
    Commit,
    Rollback,
}

impl Finalize {
    fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        }
    }

    fn apply(self, resource: &mut dyn Resource) -> DbResult<()> {
        match self {
            Self::Commit => resource.commit(),
            Self::Rollback => resource.rollback(),
        }
    }
}

/// Scope-aware database entry point shared by every request.
pub struct Database {
    factory: Arc<dyn ResourceFactory>,
    bindings: DashMap<ScopeToken, Handle>,
    query_tracker: OutputTracker<Statement>,
}

impl Database {
    /// Creates a manager over any connection factory.
    pub fn new(factory: Arc<dyn ResourceFactory>) -> Self {
        Self {
            factory,
            bindings: DashMap::new(),
            query_tracker: OutputTracker::new(),
        }
    }

    /// Creates a manager over SQLite at the configured location.
    ///
    /// No connection is opened until the first statement runs.
    pub fn open(config: &DatabaseConfig) -> Self {
        Self::new(Arc::new(SqliteFactory::new(config)))
    }

    /// Creates a manager over SQLite and registers it for request outcomes.
    pub fn create(config: &DatabaseConfig, hub: &LifecycleHub) -> Arc<Self> {
        let database = Arc::new(Self::open(config));
        database.register(hub);
        database
    }

    /// Creates a manager over a scripted stand-in.
    ///
    /// Every `execute` consumes the next response, in call order, across all
    /// scopes.
    pub fn create_null(responses: impl IntoIterator<Item = StubResponse>) -> Self {
        Self::new(Arc::new(StubFactory::new(responses)))
    }

    /// Registers commit on request success and rollback on request failure.
    ///
    /// Finalize failures are logged; they do not escape the hub.
    pub fn register(self: &Arc<Self>, hub: &LifecycleHub) {
        let on_success = Arc::clone(self);
        let on_failure = Arc::clone(self);
        hub.add_request_listener(
            move |scope| {
                if let Err(err) = on_success.commit_in(scope) {
                    error!(
                        "event=request_finalize module=db status=error op=commit scope={} error={}",
                        scope, err
                    );
                }
            },
            move |scope| {
                if let Err(err) = on_failure.rollback_in(scope) {
                    error!(
                        "event=request_finalize module=db status=error op=rollback scope={} error={}",
                        scope, err
                    );
                }
            },
        );
    }

    /// Records of every statement issued through this manager, batched by
    /// finalize calls.
    pub fn query_tracker(&self) -> &OutputTracker<Statement> {
        &self.query_tracker
    }

    /// Runs `statement` in the calling thread's scope.
    pub fn execute(&self, statement: &Statement) -> DbResult<ResultSet> {
        self.execute_in(&ScopeToken::current(), statement)
    }

    /// Runs `statement` on the connection bound to `scope`, binding a new one
    /// if needed.
    ///
    /// # Errors
    /// - `DbError::ResourceUnavailable` when no connection could be created;
    ///   the scope stays unbound.
    /// - Any error from the connection, unchanged.
    pub fn execute_in(&self, scope: &ScopeToken, statement: &Statement) -> DbResult<ResultSet> {
        self.query_tracker.add(statement.clone());

        let handle = self.handle_for(scope)?;
        let mut resource = handle.lock();
        resource.execute(statement).map_err(|err| {
            debug!(
                "event=db_execute module=db status=error scope={} error={}",
                scope, err
            );
            err
        })
    }

    /// Commits the calling thread's scope. No-op when nothing is bound.
    pub fn commit(&self) -> DbResult<()> {
        self.commit_in(&ScopeToken::current())
    }

    /// Rolls back the calling thread's scope. No-op when nothing is bound.
    pub fn rollback(&self) -> DbResult<()> {
        self.rollback_in(&ScopeToken::current())
    }

    pub fn commit_in(&self, scope: &ScopeToken) -> DbResult<()> {
        self.finalize(scope, Finalize::Commit)
    }

    pub fn rollback_in(&self, scope: &ScopeToken) -> DbResult<()> {
        self.finalize(scope, Finalize::Rollback)
    }

    /// Returns `true` while a connection is bound to `scope`.
    pub fn is_bound(&self, scope: &ScopeToken) -> bool {
        self.bindings.contains_key(scope)
    }

    /// Number of scopes currently holding a connection.
    pub fn bound_scopes(&self) -> usize {
        self.bindings.len()
    }

    fn handle_for(&self, scope: &ScopeToken) -> DbResult<Handle> {
        if let Some(bound) = self.bindings.get(scope) {
            return Ok(Arc::clone(bound.value()));
        }

        let created: Handle = Arc::new(Mutex::new(self.factory.connect()?));
        let bound = Arc::clone(
            self.bindings
                .entry(*scope)
                .or_insert_with(|| Arc::clone(&created))
                .value(),
        );

        if Arc::ptr_eq(&bound, &created) {
            debug!(
                "event=scope_bind module=db status=ok scope={} location={}",
                scope,
                self.factory.location()
            );
        } else {
            // Another caller bound this scope first.
            let _ = release(created, scope);
        }
        Ok(bound)
    }

    fn finalize(&self, scope: &ScopeToken, op: Finalize) -> DbResult<()> {
        let Some(handle) = self.bindings.get(scope).map(|bound| Arc::clone(bound.value())) else {
            debug!(
                "event=scope_finalize module=db status=noop op={} scope={}",
                op.as_str(),
                scope
            );
            return Ok(());
        };

        let started_at = Instant::now();
        let outcome = {
            let mut resource = handle.lock();
            let outcome = op.apply(&mut **resource);
            self.bindings.remove(scope);
            outcome
        };
        let closed = release(handle, scope);
        self.query_tracker.end_batch();

        let result = outcome.and(closed);
        match &result {
            Ok(()) => info!(
                "event=scope_finalize module=db status=ok op={} scope={} duration_ms={}",
                op.as_str(),
                scope,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=scope_finalize module=db status=error op={} scope={} duration_ms={} error={}",
                op.as_str(),
                scope,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

/// Closes a handle nobody else references. A handle still shared with an
/// in-flight caller is dropped by that caller instead.
fn release(handle: Handle, scope: &ScopeToken) -> DbResult<()> {
    match Arc::try_unwrap(handle) {
        Ok(resource) => resource.into_inner().close(),
        Err(_) => {
            warn!(
                "event=scope_release module=db status=deferred scope={}",
                scope
            );
            Ok(())
        }
    }
}
