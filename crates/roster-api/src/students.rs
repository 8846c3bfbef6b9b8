//! Handlers for `/students` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/students` | Filter query, see [`StudentQuery`]. 404 if empty |
//! | `GET`    | `/students/{id}` | |
//! | `POST`   | `/students/create-single` | Body: [`CreateBody`] |
//! | `POST`   | `/students/create-multiple` | Body: `[CreateBody]` |
//! | `PATCH`  | `/students/update-info/{id}` | Body: [`UpdateBody`] |
//! | `POST`   | `/students/{id}/subjects` | Body: [`EnrollBody`] |
//! | `PATCH`  | `/students/{id}/subjects` | Body: [`GradeBody`] |
//! | `DELETE` | `/students/{id}/subjects/{subject_id}` | |
//! | `DELETE` | `/students/hard-delete/{id}` | 204 |
//! | `DELETE` | `/students/soft-delete/{id}` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use roster_core::{
  Roster,
  filter::{StudentFilter, StudentQuery},
  store::RosterStore,
  student::{Enrollment, NewStudent, Student, StudentPatch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, validate};

// ─── List / get ──────────────────────────────────────────────────────────────

/// `GET /students[?active=&id=&student_id=&name=&last_name=&group=&subjects=&grade=&grade_min=&grade_max=]`
pub async fn list<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Query(query): Query<StudentQuery>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let filter = StudentFilter::parse(&query)?;
  let students = roster.find_students(filter).await?;
  if students.is_empty() {
    return Err(ApiError::NotFound("no students match the given filters".into()));
  }
  Ok(Json(students))
}

/// `GET /students/{id}`
pub async fn get_one<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  Ok(Json(roster.get_student(id).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EnrollBody {
  pub subject_id: Uuid,
  pub grade:      Option<f64>,
}

impl EnrollBody {
  fn into_enrollment(self) -> Result<Enrollment, ApiError> {
    let grade = self.grade.map(validate::grade).transpose()?;
    Ok(Enrollment::new(self.subject_id, grade))
  }
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub student_id: i64,
  pub name:       String,
  pub last_name:  String,
  pub birth_date: NaiveDate,
  pub group:      Option<String>,
  #[serde(default)]
  pub subjects:   Vec<EnrollBody>,
  pub active:     Option<bool>,
}

impl CreateBody {
  fn into_new_student(self) -> Result<NewStudent, ApiError> {
    let number = validate::student_number(self.student_id)?;
    validate::person_name("name", &self.name)?;
    validate::person_name("last_name", &self.last_name)?;
    if let Some(group) = &self.group {
      validate::group(group)?;
    }

    let mut student = NewStudent::new(number, self.name, self.last_name, self.birth_date);
    student.group = self.group;
    student.enrollments = self
      .subjects
      .into_iter()
      .map(EnrollBody::into_enrollment)
      .collect::<Result<_, _>>()?;
    if let Some(active) = self.active {
      student.active = active;
    }
    Ok(student)
  }
}

/// `POST /students/create-single`
pub async fn create_one<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let student = roster.create_student(body.into_new_student()?).await?;
  Ok((StatusCode::CREATED, Json(student)))
}

/// `POST /students/create-multiple`
pub async fn create_many<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Json(body): Json<Vec<CreateBody>>,
) -> Result<impl IntoResponse, ApiError> {
  validate::non_empty("students", &body)?;
  let inputs = body
    .into_iter()
    .map(CreateBody::into_new_student)
    .collect::<Result<Vec<_>, _>>()?;
  let students = roster.create_students(inputs).await?;
  Ok((StatusCode::CREATED, Json(students)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub student_id: Option<i64>,
  pub name:       Option<String>,
  pub last_name:  Option<String>,
  pub birth_date: Option<NaiveDate>,
  pub group:      Option<String>,
  pub active:     Option<bool>,
}

impl UpdateBody {
  fn into_patch(self) -> Result<StudentPatch, ApiError> {
    if let Some(name) = &self.name {
      validate::person_name("name", name)?;
    }
    if let Some(last_name) = &self.last_name {
      validate::person_name("last_name", last_name)?;
    }
    if let Some(group) = &self.group {
      validate::group(group)?;
    }
    Ok(StudentPatch {
      student_id: self.student_id.map(validate::student_number).transpose()?,
      name:       self.name,
      last_name:  self.last_name,
      birth_date: self.birth_date,
      group:      self.group,
      active:     self.active,
    })
  }
}

/// `PATCH /students/update-info/{id}`
pub async fn update_info<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Student>, ApiError> {
  Ok(Json(roster.update_student(id, body.into_patch()?).await?))
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

/// `POST /students/{id}/subjects`
pub async fn enroll<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<EnrollBody>,
) -> Result<impl IntoResponse, ApiError> {
  let entry = body.into_enrollment()?;
  let student = roster.enroll(id, entry.subject_id, entry.grade).await?;
  Ok((StatusCode::CREATED, Json(student)))
}

#[derive(Debug, Deserialize)]
pub struct GradeBody {
  pub subject_id: Uuid,
  pub grade:      f64,
}

/// `PATCH /students/{id}/subjects`
pub async fn update_grade<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<GradeBody>,
) -> Result<Json<Student>, ApiError> {
  let grade = validate::grade(body.grade)?;
  Ok(Json(roster.update_grade(id, body.subject_id, grade).await?))
}

/// `DELETE /students/{id}/subjects/{subject_id}`
pub async fn unenroll<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path((id, subject_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Student>, ApiError> {
  Ok(Json(roster.unenroll(id, subject_id).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /students/hard-delete/{id}`
pub async fn hard_delete<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  roster.hard_delete_student(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /students/soft-delete/{id}`
pub async fn soft_delete<S: RosterStore>(
  State(roster): State<Arc<Roster<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  Ok(Json(roster.soft_delete_student(id).await?))
}
