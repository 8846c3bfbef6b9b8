//! [`SqliteStore`]: the SQLite implementation of [`RosterStore`].

use std::path::Path;

use rusqlite::{TransactionBehavior, functions::FunctionFlags};
use roster_core::store::{Documents, RosterStore};

use crate::{Error, Result, documents::SqliteDocuments, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster store backed by a single SQLite file.
///
/// Cloning is cheap, the inner connection is reference-counted. All work
/// runs on the connection's dedicated thread, one transaction at a time.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by the tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        register_functions(conn)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `work` on the connection thread inside a transaction opened with
  /// `behavior`, committing only if it returns `Ok`. Dropping the
  /// uncommitted transaction rolls it back.
  async fn within<T, F>(&self, behavior: TransactionBehavior, work: F) -> roster_core::Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> roster_core::Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(behavior)?;
        let outcome = work(&SqliteDocuments::new(&tx));
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await
      .map_err(Error::from)?;
    outcome
  }
}

/// `casefold(text)`: Unicode lowercase, so `LIKE` matches accented names
/// regardless of case. NULL stays NULL.
fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "casefold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
  )
}

// ─── RosterStore impl ────────────────────────────────────────────────────────

impl RosterStore for SqliteStore {
  /// `BEGIN IMMEDIATE`: the transaction holds the write lock from its first
  /// read.
  async fn transaction<T, F>(&self, work: F) -> roster_core::Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> roster_core::Result<T> + Send + 'static,
  {
    self.within(TransactionBehavior::Immediate, work).await
  }

  /// `BEGIN DEFERRED`: a plain WAL snapshot, so readers never wait on a
  /// writer.
  async fn read<T, F>(&self, work: F) -> roster_core::Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> roster_core::Result<T> + Send + 'static,
  {
    self.within(TransactionBehavior::Deferred, work).await
  }
}
