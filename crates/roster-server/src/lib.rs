//! HTTP server wiring for the roster.
//!
//! Mounts the JSON API under `/api/v1` and adds per-request tracing.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use roster_core::{Roster, store::RosterStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "0.0.0.0".to_string(),
      port:       3000,
      store_path: PathBuf::from("roster.db"),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router for `roster`.
pub fn router<S>(roster: Arc<Roster<S>>) -> Router
where
  S: RosterStore + 'static,
{
  Router::new()
    .nest("/api/v1", roster_api::api_router(roster))
    .layer(TraceLayer::new_for_http())
}
