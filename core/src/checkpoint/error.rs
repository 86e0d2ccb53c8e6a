use super::BlockHash;
use primitive_types::U256;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckpointError {
    #[error("malformed checkpoint hash: {0:?}")]
    MalformedHash(String),

    #[error("malformed difficulty checkpoint: {0:?}")]
    MalformedDifficulty(String),

    #[error(
        "checkpoint at height {height} already exists with hash {existing}, refusing {proposed}"
    )]
    ConflictingCheckpoint {
        height: u64,
        existing: BlockHash,
        proposed: BlockHash,
    },

    #[error(
        "difficulty checkpoint at height {height} already exists with {existing}, refusing {proposed}"
    )]
    ConflictingDifficulty {
        height: u64,
        existing: U256,
        proposed: U256,
    },

    #[error("checkpoint file {path:?} is unreadable: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("DNS checkpoint lookup unavailable: {0}")]
    NetworkUnavailable(String),
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Source whose failure aborted a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Defaults,
    File,
    Dns,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Defaults => f.write_str("compiled defaults"),
            SourceKind::File => f.write_str("checkpoint file"),
            SourceKind::Dns => f.write_str("DNS"),
        }
    }
}

/// Fatal merge failure. Startup must not continue past one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checkpoint merge failed in {source_kind}{at}: {error}", at = at_height(.height))]
pub struct MergeError {
    pub source_kind: SourceKind,
    pub height: Option<u64>,
    #[source]
    pub error: CheckpointError,
}

fn at_height(height: &Option<u64>) -> String {
    height.map(|h| format!(" at height {}", h)).unwrap_or_default()
}
