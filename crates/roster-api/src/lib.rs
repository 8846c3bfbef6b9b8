//! JSON REST API for the roster.
//!
//! Exposes an axum [`Router`] backed by a [`Roster`] over any
//! [`RosterStore`]. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", roster_api::api_router(roster.clone()))
//! ```

pub mod error;
pub mod students;
pub mod subjects;
mod validate;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, patch, post},
};
use roster_core::{Roster, store::RosterStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `roster`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(roster: Arc<Roster<S>>) -> Router<()>
where
  S: RosterStore + 'static,
{
  Router::new()
    // Students
    .route("/students", get(students::list::<S>))
    .route("/students/{id}", get(students::get_one::<S>))
    .route("/students/create-single", post(students::create_one::<S>))
    .route("/students/create-multiple", post(students::create_many::<S>))
    .route("/students/update-info/{id}", patch(students::update_info::<S>))
    .route(
      "/students/{id}/subjects",
      post(students::enroll::<S>).patch(students::update_grade::<S>),
    )
    .route("/students/{id}/subjects/{subject_id}", delete(students::unenroll::<S>))
    .route("/students/hard-delete/{id}", delete(students::hard_delete::<S>))
    .route("/students/soft-delete/{id}", delete(students::soft_delete::<S>))
    // Subjects
    .route("/subjects", get(subjects::list::<S>))
    .route("/subjects/{id}", get(subjects::get_one::<S>))
    .route("/subjects/create-single", post(subjects::create_one::<S>))
    .route("/subjects/create-multiple", post(subjects::create_many::<S>))
    .route("/subjects/update-info/{id}", patch(subjects::update_info::<S>))
    .route("/subjects/{id}/students/add", post(subjects::add_students::<S>))
    .route("/subjects/{id}/students/remove", delete(subjects::remove_students::<S>))
    .route("/subjects/hard-delete/{id}", delete(subjects::hard_delete::<S>))
    .route("/subjects/soft-delete/{id}", delete(subjects::soft_delete::<S>))
    .with_state(roster)
}
