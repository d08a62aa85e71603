//! Logical scope identifiers.

use std::fmt::{Display, Formatter};
use uuid::Uuid;

thread_local! {
    static THREAD_SCOPE: ScopeToken = ScopeToken::new();
}

/// Identifies one logical unit of work, usually one request.
///
/// Tokens are either created per request with [`ScopeToken::new`] or derived
/// from the calling thread with [`ScopeToken::current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeToken(Uuid);

impl ScopeToken {
    /// Creates a fresh token that no other scope uses.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the token of the calling thread. Stable for the thread's life.
    pub fn current() -> Self {
        THREAD_SCOPE.with(|token| *token)
    }
}

impl Display for ScopeToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
