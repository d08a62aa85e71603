//! Project use-case service.
//!
//! # Responsibility
//! - Provide the list/create entry points used by executables.
//! - Record every project it creates, so callers can observe writes without
//!   reading storage back.
//!
//! # Invariants
//! - Service APIs never bypass the repository contract.
//! - Names are trimmed; empty names are rejected before touching storage.

use crate::model::project::Project;
use crate::repo::project_repo::{ProjectStore, RepoError};
use crate::support::output_tracker::OutputTracker;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    InvalidName(String),
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid project name `{name}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Use-case service wrapper for project listing and creation.
pub struct ProjectService<R: ProjectStore> {
    repo: R,
    saved_projects: OutputTracker<Project>,
}

impl<R: ProjectStore> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            saved_projects: OutputTracker::new(),
        }
    }

    pub fn all_projects(&self) -> ServiceResult<Vec<Project>> {
        Ok(self.repo.all_projects()?)
    }

    /// Creates and saves a project named `name`.
    ///
    /// # Contract
    /// - Leading/trailing whitespace is stripped.
    /// - The created project is recorded in `saved_projects()` once the
    ///   repository accepted it.
    pub fn create_project(&self, name: &str) -> ServiceResult<Project> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::InvalidName(name.to_string()));
        }

        let project = Project::new(trimmed);
        self.repo.save_project(&project)?;
        self.saved_projects.add(project.clone());
        Ok(project)
    }

    /// Projects created through this service, in creation order.
    pub fn saved_projects(&self) -> &OutputTracker<Project> {
        &self.saved_projects
    }
}
