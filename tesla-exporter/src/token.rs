//! File-backed OAuth token storage.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::StorageConfig;
use crate::storage::{self, StorageError};

/// Which of the two persisted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Access and refresh token files, one token per file.
///
/// Nothing is cached in memory: every read goes back to disk so that tokens
/// replaced by another process are picked up.
#[derive(Debug, Clone)]
pub struct TokenStore {
    access_path: PathBuf,
    refresh_path: PathBuf,
}

impl TokenStore {
    pub fn new(access_path: impl Into<PathBuf>, refresh_path: impl Into<PathBuf>) -> Self {
        Self {
            access_path: access_path.into(),
            refresh_path: refresh_path.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.access_token_file, &config.refresh_token_file)
    }

    fn path(&self, kind: TokenKind) -> &Path {
        match kind {
            TokenKind::Access => &self.access_path,
            TokenKind::Refresh => &self.refresh_path,
        }
    }

    /// Read a token, with its trailing newline stripped.
    ///
    /// Returns `None` if the file is missing or unreadable.
    pub fn read(&self, kind: TokenKind) -> Option<String> {
        match storage::read_to_string(self.path(kind)) {
            Ok(content) => Some(content.trim_end_matches('\n').to_string()),
            Err(e) => {
                warn!(token = %kind, error = %e, "Cannot read token");
                None
            }
        }
    }

    /// Atomically replace a token.
    pub fn write(&self, kind: TokenKind, value: &str) -> Result<(), StorageError> {
        storage::write_atomic(self.path(kind), value)
    }
}
