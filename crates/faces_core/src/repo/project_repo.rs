//! Project repository contracts and `Database`-backed implementation.
//!
//! # Responsibility
//! - List and save projects through the scoped database.
//! - Create and seed the `projects` table on first start.
//!
//! # Invariants
//! - Initialization only creates schema when the probe read reports a
//!   missing table; every other failure is returned untouched.
//! - Read paths reject rows without a text `name` instead of masking them.

use crate::config::DatabaseConfig;
use crate::db::stub::StubResponse;
use crate::db::{Database, DbError, DbResult, Record};
use crate::lifecycle::LifecycleHub;
use crate::model::project::Project;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Names inserted when the table is created.
pub const SEED_PROJECT_NAMES: [&str; 2] = ["foo", "bar"];

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted project data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Statements issued by the project repository.
pub mod sql {
    use super::SEED_PROJECT_NAMES;
    use crate::db::Statement;

    pub fn select_names() -> Statement {
        Statement::new("SELECT name FROM projects")
    }

    pub fn create_table() -> Statement {
        Statement::new("CREATE TABLE projects (name TEXT)")
    }

    pub fn insert_seed() -> Statement {
        SEED_PROJECT_NAMES.iter().fold(
            Statement::new("INSERT INTO projects (name) VALUES (?1), (?2)"),
            |statement, name| statement.bind(name.to_string()),
        )
    }

    pub fn insert_project(name: &str) -> Statement {
        Statement::new("INSERT INTO projects (name) VALUES (?1)").bind(name.to_string())
    }
}

/// Storage contract the project service depends on.
pub trait ProjectStore {
    fn all_projects(&self) -> RepoResult<Vec<Project>>;
    fn save_project(&self, project: &Project) -> RepoResult<()>;
}

impl<S: ProjectStore + ?Sized> ProjectStore for Arc<S> {
    fn all_projects(&self) -> RepoResult<Vec<Project>> {
        (**self).all_projects()
    }

    fn save_project(&self, project: &Project) -> RepoResult<()> {
        (**self).save_project(project)
    }
}

/// Project repository running statements through a scoped `Database`.
pub struct ProjectRepository {
    database: Arc<Database>,
}

impl ProjectRepository {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Opens the configured SQLite database and registers both the database
    /// (request outcomes) and the repository (startup) on `hub`.
    pub fn create(config: &DatabaseConfig, hub: &LifecycleHub) -> Arc<Self> {
        let repo = Arc::new(Self::new(Database::create(config, hub)));
        repo.register(hub);
        repo
    }

    /// Repository over a stand-in database that answers each statement with
    /// the next response, in order.
    pub fn create_null(responses: impl IntoIterator<Item = StubResponse>) -> Self {
        Self::new(Arc::new(Database::create_null(responses)))
    }

    /// Scripted response listing `projects`, for use with `create_null`.
    pub fn listing(projects: &[Project]) -> StubResponse {
        StubResponse::rows(
            projects
                .iter()
                .map(|project| [("name", project.name.clone())]),
        )
    }

    /// Registers `initialize` to run when the hub starts.
    pub fn register(self: &Arc<Self>, hub: &LifecycleHub) {
        let repo = Arc::clone(self);
        hub.add_start_listener(move || repo.initialize().map_err(Into::into));
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Ensures the `projects` table exists, seeding it when created.
    ///
    /// Runs in the calling thread's scope and finalizes that scope.
    ///
    /// # Errors
    /// - Any probe failure other than a missing table; the scope is rolled
    ///   back first.
    /// - Failures while creating, seeding or committing; the scope is rolled
    ///   back as well.
    pub fn initialize(&self) -> RepoResult<()> {
        match self.database.execute(&sql::select_names()) {
            Ok(_) => {
                self.database.commit()?;
                info!("event=repo_initialize module=repo status=ok action=none");
                Ok(())
            }
            Err(err) if err.is_schema_missing() => {
                if let Err(err) = self.create_and_seed() {
                    self.abandon(&err);
                    return Err(err.into());
                }
                info!(
                    "event=repo_initialize module=repo status=ok action=create_and_seed seeded={}",
                    SEED_PROJECT_NAMES.len()
                );
                Ok(())
            }
            Err(err) => {
                self.abandon(&err);
                Err(err.into())
            }
        }
    }

    fn create_and_seed(&self) -> DbResult<()> {
        self.database.execute(&sql::create_table())?;
        self.database.execute(&sql::insert_seed())?;
        self.database.commit()
    }

    /// Logs `err` and rolls back the initializing scope. A finished commit
    /// leaves nothing bound, so the rollback is then a no-op.
    fn abandon(&self, err: &DbError) {
        error!(
            "event=repo_initialize module=repo status=error error={}",
            err
        );
        if let Err(rollback_err) = self.database.rollback() {
            warn!(
                "event=repo_initialize module=repo status=error op=rollback error={}",
                rollback_err
            );
        }
    }
}

impl ProjectStore for ProjectRepository {
    fn all_projects(&self) -> RepoResult<Vec<Project>> {
        self.database
            .execute(&sql::select_names())?
            .into_iter()
            .map(|record| parse_project_row(&record))
            .collect()
    }

    fn save_project(&self, project: &Project) -> RepoResult<()> {
        self.database.execute(&sql::insert_project(&project.name))?;
        Ok(())
    }
}

fn parse_project_row(record: &Record) -> RepoResult<Project> {
    record.get_text("name").map(Project::new).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "expected text value in projects.name, got {:?}",
            record.get("name")
        ))
    })
}
