//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | `?active=&id=&name=&students=`. 404 if empty |
//! | `GET`    | `/subjects/{id}` | |
//! | `POST`   | `/subjects/create-single` | Body: [`CreateBody`] |
//! | `POST`   | `/subjects/create-multiple` | Body: `[CreateBody]` |
//! | `PATCH`  | `/subjects/update-info/{id}` | Body: [`UpdateBody`] |
//! | `POST`   | `/subjects/{id}/students/add` | Body: `[student id]` |
//! | `DELETE` | `/subjects/{id}/students/remove` | Body: `[student id]` |
//! | `DELETE` | `/subjects/hard-delete/{id}` | 204 |
//! | `DELETE` | `/subjects/soft-delete/{id}` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  Roster,
  filter::{SubjectFilter, SubjectQuery},
  store::RosterStore,
  subject::{NewSubject, Subject, SubjectPatch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, validate};

// ─── List / get ──────────────────────────────────────────────────────────────

/// `GET /subjects`
pub async fn list<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Query(query): Query<SubjectQuery>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  let subjects = roster.find_subjects(SubjectFilter::parse(&query)?).await?;
  if subjects.is_empty() {
    return Err(ApiError::NotFound("no subjects match the given filters".into()));
  }
  Ok(Json(subjects))
}

/// `GET /subjects/{id}`
pub async fn get_one<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError> {
  Ok(Json(roster.get_subject(id).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:     String,
  #[serde(default)]
  pub students: Vec<Uuid>,
  pub active:   Option<bool>,
}

impl CreateBody {
  fn into_new_subject(self) -> Result<NewSubject, ApiError> {
    validate::person_name("name", &self.name)?;
    let mut subject = NewSubject::new(self.name);
    subject.enrolled_students = self.students;
    if let Some(active) = self.active {
      subject.active = active;
    }
    Ok(subject)
  }
}

/// `POST /subjects/create-single`
pub async fn create_one<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let subject = roster.create_subject(body.into_new_subject()?).await?;
  Ok((StatusCode::CREATED, Json(subject)))
}

/// `POST /subjects/create-multiple`
pub async fn create_many<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Json(body): Json<Vec<CreateBody>>,
) -> Result<impl IntoResponse, ApiError> {
  validate::non_empty("subjects", &body)?;
  let inputs = body
    .into_iter()
    .map(CreateBody::into_new_subject)
    .collect::<Result<Vec<_>, _>>()?;
  Ok((StatusCode::CREATED, Json(roster.create_subjects(inputs).await?)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub name:   Option<String>,
  pub active: Option<bool>,
}

/// `PATCH /subjects/update-info/{id}`
pub async fn update_info<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Subject>, ApiError> {
  if let Some(name) = &body.name {
    validate::person_name("name", name)?;
  }
  let patch = SubjectPatch { name: body.name, active: body.active };
  Ok(Json(roster.update_subject(id, patch).await?))
}

// ─── Students ────────────────────────────────────────────────────────────────

/// `POST /subjects/{id}/students/add`
pub async fn add_students<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
  Json(student_ids): Json<Vec<Uuid>>,
) -> Result<impl IntoResponse, ApiError> {
  validate::non_empty("students", &student_ids)?;
  let subject = roster.add_students(id, student_ids).await?;
  Ok((StatusCode::CREATED, Json(subject)))
}

/// `DELETE /subjects/{id}/students/remove`
pub async fn remove_students<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
  Json(student_ids): Json<Vec<Uuid>>,
) -> Result<Json<Subject>, ApiError> {
  validate::non_empty("students", &student_ids)?;
  Ok(Json(roster.remove_students(id, student_ids).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /subjects/hard-delete/{id}`
pub async fn hard_delete<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  roster.hard_delete_subject(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /subjects/soft-delete/{id}`
pub async fn soft_delete<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError> {
  Ok(Json(roster.soft_delete_subject(id).await?))
}
