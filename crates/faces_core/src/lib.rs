//! Core logic for Faces.
//! This crate owns scoped database access, the lifecycle hub that drives it,
//! and the project list built on top of both.

pub mod config;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod support;

pub use config::{AppConfig, DatabaseConfig, DbLocation, LogConfig};
pub use db::stub::{StubFactory, StubResponse};
pub use db::{Database, DbError, DbResult, Record, ResultSet, ScopeToken, Statement};
pub use lifecycle::{LifecycleError, LifecycleHub, ListenerError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::project::Project;
pub use repo::project_repo::{ProjectRepository, ProjectStore, RepoError, RepoResult};
pub use service::project_service::{ProjectService, ServiceError, ServiceResult};
pub use support::output_tracker::{OutputTracker, TrackerError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
