//! Runtime configuration for Faces core.
//!
//! # Responsibility
//! - Describe where the database lives and how connections are tuned.
//! - Describe optional file logging for executables.
//!
//! # Invariants
//! - Configuration values are plain data; nothing here opens files.

use std::path::PathBuf;
use std::time::Duration;

/// Database file used when nothing else is configured.
pub const DEFAULT_DB_FILE: &str = "faces.db";
/// Environment variable overriding the database file path.
pub const DB_PATH_ENV: &str = "FACES_DB_PATH";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Backing store location for SQLite connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    /// Every connection gets its own private in-memory database.
    Memory,
}

impl DbLocation {
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Memory => ":memory:".to_string(),
        }
    }
}

/// Connection settings for `Database::open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub location: DbLocation,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DbLocation::File(path.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: DbLocation::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Reads `FACES_DB_PATH`, falling back to `faces.db` in the working
    /// directory.
    pub fn from_env() -> Self {
        match std::env::var(DB_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::file(path.trim()),
            _ => Self::file(DEFAULT_DB_FILE),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DB_FILE)
    }
}

/// File logging settings. See `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub log_dir: PathBuf,
}

/// Top-level configuration assembled by executables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: Option<LogConfig>,
}

#[cfg(test)]
mod tests {
    use super::{DatabaseConfig, DbLocation, DEFAULT_DB_FILE};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn default_points_at_faces_db() {
        let config = DatabaseConfig::default();
        assert_eq!(
            config.location,
            DbLocation::File(PathBuf::from(DEFAULT_DB_FILE))
        );
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn memory_location_describes_itself() {
        assert_eq!(DatabaseConfig::in_memory().location.describe(), ":memory:");
    }

    #[test]
    fn busy_timeout_can_be_overridden() {
        let config = DatabaseConfig::in_memory().with_busy_timeout(Duration::from_millis(250));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }
}
