//! Chooses the storage backend for the school at startup.
//!
//! The server reads `[repository] type` from its config file and hands the
//! `[postgres]` section through when the Postgres backend is selected.

use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::{PostgresSettings, RepositorySettings};
use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};
use super::PostgresConfig;

/// Storage backend selected by `[repository] type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Diesel over a Postgres pool
    Postgres,
    /// Process memory; everything is lost on restart
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Accepts `"local"`, `"postgres"` or `"pg"`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

/// Builds the shared repository handle the services run against.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository of the given type.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConfigurationError)` - Postgres was requested
    ///   without a config, or the `postgres-repo` feature is off
    pub async fn create(
        repo_type: RepositoryType,
        postgres_config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match repo_type {
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = postgres_config.ok_or_else(|| {
                        RepositoryError::configuration("Postgres repository requires a [postgres] section")
                    })?;
                    let repo = PostgresRepository::new(config.clone())?;
                    Ok(Arc::new(repo) as Arc<dyn FullRepository>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    let _ = postgres_config;
                    Err(RepositoryError::configuration("Postgres repository feature not enabled"))
                }
            }
            RepositoryType::Local => Ok(Arc::new(LocalRepository::new())),
        }
    }

    /// Create a repository from the `[repository]` and `[postgres]` config sections.
    pub async fn from_settings(
        repository: &RepositorySettings,
        postgres: &PostgresSettings,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let repo_type = repository.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;

        match repo_type {
            RepositoryType::Postgres => {
                let config = postgres.to_postgres_config()?;
                Self::create(RepositoryType::Postgres, Some(&config)).await
            }
            RepositoryType::Local => Self::create(RepositoryType::Local, None).await,
        }
    }
}
