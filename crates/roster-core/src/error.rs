//! Error types for `roster-core`.

use thiserror::Error;
use uuid::Uuid;

/// Which collection an id belongs to. Used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
  Student,
  Subject,
}

impl std::fmt::Display for EntityKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      EntityKind::Student => f.write_str("student"),
      EntityKind::Subject => f.write_str("subject"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("student with id {0} doesn't exist")]
  StudentNotFound(Uuid),

  #[error("subject with id {0} doesn't exist")]
  SubjectNotFound(Uuid),

  #[error("at least one {0} must be provided")]
  EmptyBatch(EntityKind),

  #[error("{kind}s with ids {} do not exist", join_ids(.ids))]
  MissingIds { kind: EntityKind, ids: Vec<Uuid> },

  #[error("{kind} {id} is referenced more than once")]
  DuplicateReference { kind: EntityKind, id: Uuid },

  #[error("grade {0} is outside the range 0..=100")]
  InvalidGrade(f64),

  #[error("invalid filter: {0}")]
  InvalidFilter(String),

  #[error("{counterpart} {counterpart_id} already exists in {owner} {owner_id}")]
  RelationExists {
    owner:          EntityKind,
    owner_id:       Uuid,
    counterpart:    EntityKind,
    counterpart_id: Uuid,
  },

  #[error("{counterpart} {counterpart_id} doesn't exist in {owner} {owner_id}")]
  RelationMissing {
    owner:          EntityKind,
    owner_id:       Uuid,
    counterpart:    EntityKind,
    counterpart_id: Uuid,
  },

  #[error("transaction failed, all changes rolled back")]
  TransactionFailed(#[source] Box<Error>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification of [`Error`], mirroring how callers react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Validation,
  RelationState,
  TransactionFailed,
}

impl Error {
  /// Wrap a backend error.
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(err))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::StudentNotFound(_) | Error::SubjectNotFound(_) => ErrorKind::NotFound,
      Error::EmptyBatch(_)
      | Error::MissingIds { .. }
      | Error::DuplicateReference { .. }
      | Error::InvalidGrade(_)
      | Error::InvalidFilter(_) => ErrorKind::Validation,
      Error::RelationExists { .. } | Error::RelationMissing { .. } => {
        ErrorKind::RelationState
      }
      Error::TransactionFailed(_) | Error::Store(_) => ErrorKind::TransactionFailed,
    }
  }

  /// True for failures detected by a precondition check, before any write.
  pub fn is_precondition(&self) -> bool {
    self.kind() != ErrorKind::TransactionFailed
  }
}

fn join_ids(ids: &[Uuid]) -> String {
  ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
