use crate::model::RecordKind;
use thiserror::Error;
use uuid::Uuid;

/// Structural invariants an operation refused to break.
///
/// Returned before any mutation is attempted, so state is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("folder {0} cannot be its own parent")]
    SelfParent(Uuid),

    #[error("moving folder {id} under {parent} would create a cycle")]
    ParentCycle { id: Uuid, parent: Uuid },

    #[error("parent folder {0} does not exist")]
    MissingParent(Uuid),

    #[error("document {0} must keep at least one page")]
    LastPage(Uuid),

    #[error("page {page} not found in document {document}")]
    PageNotFound { document: Uuid, page: Uuid },
}

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: Uuid },

    #[error("{kind} {id} is corrupt: {reason}")]
    Corrupt {
        kind: RecordKind,
        id: Uuid,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityViolation),

    #[error("{kind} {id} is too large to store ({len} bytes)")]
    TooLarge {
        kind: RecordKind,
        id: Uuid,
        len: usize,
    },

    #[error("Config error: {0}")]
    Config(String),
}

impl VaultError {
    pub fn not_found(kind: RecordKind, id: Uuid) -> Self {
        VaultError::NotFound { kind, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::NotFound { .. })
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, VaultError::Corrupt { .. })
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
