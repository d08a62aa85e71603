//! Process-wide lifecycle event hub.
//!
//! # Responsibility
//! - Run start listeners once at boot.
//! - Report each request scope's outcome (success or failure) to request
//!   listeners.
//!
//! # Invariants
//! - Registrations only grow; invocation order is registration order.
//! - Start is fail-fast: the first failing listener stops the sequence.
//! - Outcome dispatch keeps no state between calls.
//! - Listeners run outside the registration lock, so they may register more
//!   listeners without deadlocking.

use crate::db::ScopeToken;
use log::{debug, error, info};
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Error type returned by start listeners.
pub type ListenerError = Box<dyn Error + Send + Sync>;

type StartListener = Arc<dyn Fn() -> Result<(), ListenerError> + Send + Sync>;
type ScopeListener = Arc<dyn Fn(&ScopeToken) + Send + Sync>;

#[derive(Clone)]
struct RequestListener {
    success: ScopeListener,
    failure: ScopeListener,
}

#[derive(Debug)]
pub enum LifecycleError {
    /// Start listener number `index` (registration order) failed.
    StartFailed { index: usize, source: ListenerError },
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartFailed { index, source } => {
                write!(f, "start listener #{index} failed: {source}")
            }
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StartFailed { source, .. } => Some(source.as_ref()),
        }
    }
}

/// Registry of start and request-outcome listeners.
#[derive(Default)]
pub struct LifecycleHub {
    start_listeners: RwLock<Vec<StartListener>>,
    request_listeners: RwLock<Vec<RequestListener>>,
}

impl LifecycleHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_start_listener<F>(&self, listener: F)
    where
        F: Fn() -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.start_listeners.write().push(Arc::new(listener));
    }

    pub fn add_request_listener<S, F>(&self, success: S, failure: F)
    where
        S: Fn(&ScopeToken) + Send + Sync + 'static,
        F: Fn(&ScopeToken) + Send + Sync + 'static,
    {
        self.request_listeners.write().push(RequestListener {
            success: Arc::new(success),
            failure: Arc::new(failure),
        });
    }

    pub fn start_listener_count(&self) -> usize {
        self.start_listeners.read().len()
    }

    pub fn request_listener_count(&self) -> usize {
        self.request_listeners.read().len()
    }

    /// Runs every start listener once, in registration order.
    ///
    /// # Errors
    /// - `LifecycleError::StartFailed` for the first failing listener; later
    ///   listeners are not run.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let listeners = self.start_listeners.read().clone();
        info!(
            "event=lifecycle_start module=lifecycle status=start listeners={}",
            listeners.len()
        );

        for (index, listener) in listeners.iter().enumerate() {
            if let Err(source) = listener() {
                error!(
                    "event=lifecycle_start module=lifecycle status=error listener={} error={}",
                    index, source
                );
                return Err(LifecycleError::StartFailed { index, source });
            }
        }

        info!("event=lifecycle_start module=lifecycle status=ok");
        Ok(())
    }

    /// Reports success of the calling thread's scope.
    pub fn on_success(&self) {
        self.on_success_in(&ScopeToken::current());
    }

    /// Reports failure of the calling thread's scope.
    pub fn on_failure(&self) {
        self.on_failure_in(&ScopeToken::current());
    }

    pub fn on_success_in(&self, scope: &ScopeToken) {
        debug!(
            "event=request_outcome module=lifecycle outcome=success scope={}",
            scope
        );
        let listeners = self.request_listeners.read().clone();
        for listener in &listeners {
            (listener.success)(scope);
        }
    }

    pub fn on_failure_in(&self, scope: &ScopeToken) {
        debug!(
            "event=request_outcome module=lifecycle outcome=failure scope={}",
            scope
        );
        let listeners = self.request_listeners.read().clone();
        for listener in &listeners {
            (listener.failure)(scope);
        }
    }

    /// Runs one request scope and reports its outcome exactly once.
    ///
    /// `Ok` fires the success listeners, `Err` the failure listeners, before
    /// the result is handed back. A panic in `work` fires the failure
    /// listeners and then resumes unwinding.
    pub fn run_request<T, E, W>(&self, scope: &ScopeToken, work: W) -> Result<T, E>
    where
        W: FnOnce() -> Result<T, E>,
    {
        let result = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(result) => result,
            Err(payload) => {
                error!(
                    "event=request_outcome module=lifecycle status=error outcome=panic scope={}",
                    scope
                );
                self.on_failure_in(scope);
                panic::resume_unwind(payload);
            }
        };
        match &result {
            Ok(_) => self.on_success_in(scope),
            Err(_) => self.on_failure_in(scope),
        }
        result
    }
}
