//! `faces` command-line entry point.
//!
//! # Responsibility
//! - Wire hub, database and repository against a SQLite file.
//! - Run one request scope per invocation and print the project list.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faces_core::{
    init_logging, AppConfig, DatabaseConfig, LifecycleHub, LogConfig, ProjectRepository,
    ProjectService, ScopeToken,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "faces", version, about = "Keep a list of projects in SQLite")]
struct Cli {
    /// SQLite database file (defaults to $FACES_DB_PATH, then ./faces.db)
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// Write rolling logs to this absolute directory
    #[arg(long = "log-dir", value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every project, one per line
    List,
    /// Add a project, then print the list
    Add {
        /// Project name
        name: String,
    },
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        let database = match &self.db {
            Some(path) => DatabaseConfig::file(path),
            None => DatabaseConfig::from_env(),
        };
        let logging = self.log_dir.as_ref().map(|log_dir| LogConfig {
            level: self
                .log_level
                .clone()
                .unwrap_or_else(|| faces_core::default_log_level().to_string()),
            log_dir: log_dir.clone(),
        });
        AppConfig { database, logging }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.app_config();

    if let Some(logging) = &config.logging {
        init_logging(logging)
            .map_err(anyhow::Error::msg)
            .context("failed to initialize logging")?;
    }

    let hub = LifecycleHub::new();
    let repo = ProjectRepository::create(&config.database, &hub);
    let service = ProjectService::new(repo);

    hub.start().with_context(|| {
        format!(
            "failed to initialize database `{}`",
            config.database.location.describe()
        )
    })?;

    let scope = ScopeToken::current();
    let projects = hub
        .run_request(&scope, || {
            if let Commands::Add { name } = &cli.command {
                let project = service.create_project(name)?;
                info!("event=cli_add module=cli status=ok name={}", project.name);
            }
            service.all_projects()
        })
        .context("request failed")?;

    for project in projects {
        println!("{}", project.name);
    }
    Ok(())
}
