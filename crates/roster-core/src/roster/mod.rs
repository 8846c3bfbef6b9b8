//! Orchestrators: the multi-step workflows that keep both sides of the
//! enrollment relation consistent.
//!
//! Every public method runs as one store transaction: validate every
//! precondition, then mutate the student side and the subject side, then
//! commit. Any failure aborts the whole transaction.

mod students;
mod subjects;

use tracing::{debug, error};

use crate::{
  Error, Result,
  store::{Documents, RosterStore},
};

/// Entry point for every read and write on the two collections.
#[derive(Debug, Clone)]
pub struct Roster<S> {
  store: S,
}

impl<S: RosterStore> Roster<S> {
  pub fn new(store: S) -> Self { Self { store } }

  /// Run `work` in a transaction.
  ///
  /// Precondition failures are returned as they are. Anything else is logged
  /// and returned as [`Error::TransactionFailed`], with the original error as
  /// its source.
  async fn run<T, F>(&self, op: &'static str, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> Result<T> + Send + 'static,
  {
    settle(op, self.store.transaction(work).await)
  }

  /// Like [`run`](Self::run), for reads that need no write lock.
  async fn read<T, F>(&self, op: &'static str, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> Result<T> + Send + 'static,
  {
    settle(op, self.store.read(work).await)
  }
}

fn settle<T>(op: &'static str, outcome: Result<T>) -> Result<T> {
  match outcome {
    Ok(value) => Ok(value),
    Err(err) if err.is_precondition() => {
      debug!(op, error = %err, "precondition failed, transaction aborted");
      Err(err)
    }
    Err(err) => {
      error!(op, error = %err, "transaction failed, all changes rolled back");
      Err(Error::TransactionFailed(Box::new(err)))
    }
  }
}
