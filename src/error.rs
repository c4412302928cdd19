//! Error types for the sweep orchestration core.
//!
//! Component errors (`ConfigurationError`, `CatalogError`, `PersistenceError`)
//! convert into [`SweepError`]. Every `SweepError` ends the run; actuator
//! failures never reach it, they stay inside the worker that saw them.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigurationError;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("No workers available: {0}")]
    NoWorkersAvailable(String),
}

/// Failures while writing checkpoints, journals or exports
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error in {context}: {error}")]
    Serialization { context: String, error: String },
    #[error("Corrupt journal line {line} in '{path}': {error}")]
    CorruptJournal {
        path: String,
        line: usize,
        error: String,
    },
}

impl PersistenceError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn serialization(context: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Serialization {
            context: context.into(),
            error: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization("JSON", error)
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;
