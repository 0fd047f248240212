use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use fieldforce_core::domain::activity::DoctorMetric;
use fieldforce_core::domain::employee::Employee;
use fieldforce_core::errors::ApplicationError;
use fieldforce_core::report::ReportPeriod;

pub mod activity;
pub mod directory;
pub mod memory;

pub use activity::SqlActivityRepository;
pub use directory::{directory_from_config, parse_directory, HttpDirectory, JsonFileDirectory};
pub use memory::{InMemoryActivityRepository, InMemoryDirectoryRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("failed to read directory document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("directory request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed directory document `{source_name}`: {message}")]
    Document { source_name: String, message: String },
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(_) | RepositoryError::Decode(_) => {
                ApplicationError::Persistence(error.to_string())
            }
            RepositoryError::Io { .. }
            | RepositoryError::Http(_)
            | RepositoryError::Document { .. } => ApplicationError::Integration(error.to_string()),
        }
    }
}

/// Per-doctor activity for one organization account over a period.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn doctor_metrics(
        &self,
        org_id: &str,
        prescription_key: Option<&str>,
        period: ReportPeriod,
    ) -> Result<Vec<DoctorMetric>, RepositoryError>;
}

/// Employee directory documents, addressed by an organization's `directory_source`.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn load(&self, source: &str) -> Result<Vec<Employee>, RepositoryError>;
}
