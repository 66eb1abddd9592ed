//! Indexer type definitions.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::MatcherError;

/// Files found by a workspace walk, split by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFiles {
    /// `.ts` catalogs, sorted by path so that load order is stable.
    pub catalogs: Vec<PathBuf>,
    pub sources: Vec<PathBuf>,
}

impl DiscoveredFiles {
    #[must_use]
    pub fn total(&self) -> usize {
        self.catalogs.len() + self.sources.len()
    }
}

#[derive(Error, Debug)]
pub enum IndexerError {
    /// Error when the workspace path is not usable
    #[error("Invalid workspace path: {0}")]
    InvalidPath(String),
    /// Error when the configured patterns do not compile
    #[error(transparent)]
    Matcher(#[from] MatcherError),
    /// Error when a blocking parse task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
