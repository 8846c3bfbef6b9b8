//! Student-side orchestrators.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::Roster;
use crate::{
  Error, Result,
  error::EntityKind,
  filter::StudentFilter,
  guard::{self, require_exists, require_relation_state},
  relation,
  store::{Documents, RosterStore, StudentUpdate},
  student::{Enrollment, Grade, NewStudent, Student, StudentPatch},
  subject::Subject,
};

/// Validate every student's enrollments, insert all of them, then register
/// each student on the subjects it references.
fn insert_students(docs: &dyn Documents, inputs: Vec<NewStudent>) -> Result<Vec<Student>> {
  let now = Utc::now();
  let students: Vec<Student> = inputs.into_iter().map(|input| input.into_student(now)).collect();

  for student in students.iter().filter(|s| !s.enrollments.is_empty()) {
    let subject_ids = student.subject_ids();
    guard::require_distinct(EntityKind::Subject, &subject_ids)?;
    guard::require_all_exist::<Subject>(docs, &subject_ids)?;
  }

  docs.insert_students(&students)?;

  for student in students.iter().filter(|s| !s.enrollments.is_empty()) {
    relation::add_student_to_subjects(docs, student.id, &student.subject_ids())?;
  }

  Ok(students)
}

impl<S: RosterStore> Roster<S> {
  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_student(&self, id: Uuid) -> Result<Student> {
    self.read("get_student", move |docs| require_exists::<Student>(docs, id)).await
  }

  /// Students matching `filter`, ordered by `student_id`.
  pub async fn find_students(&self, filter: StudentFilter) -> Result<Vec<Student>> {
    self.read("find_students", move |docs| docs.find_students(&filter)).await
  }

  // ── Creation ──────────────────────────────────────────────────────────

  /// Insert a student. Each enrolled subject must exist and gains the new
  /// student's id.
  pub async fn create_student(&self, input: NewStudent) -> Result<Student> {
    let student = self
      .run("create_student", move |docs| {
        let mut created = insert_students(docs, vec![input])?;
        Ok(created.remove(0))
      })
      .await?;
    info!(student = %student.id, enrollments = student.enrollments.len(), "student created");
    Ok(student)
  }

  /// Insert several students at once; a single invalid enrollment aborts
  /// the whole batch.
  pub async fn create_students(&self, inputs: Vec<NewStudent>) -> Result<Vec<Student>> {
    let students = self
      .run("create_students", move |docs| insert_students(docs, inputs))
      .await?;
    info!(count = students.len(), "students created");
    Ok(students)
  }

  // ── Updates ───────────────────────────────────────────────────────────

  /// Overwrite only the fields present in `patch`.
  pub async fn update_student(&self, id: Uuid, patch: StudentPatch) -> Result<Student> {
    let student = self
      .run("update_student", move |docs| {
        let current = require_exists::<Student>(docs, id)?;
        if patch.is_empty() {
          return Ok(current);
        }
        docs
          .update_student(id, &StudentUpdate::Fields(patch))?
          .ok_or(Error::StudentNotFound(id))
      })
      .await?;
    info!(student = %id, "student updated");
    Ok(student)
  }

  /// Enroll a student in a subject. The pairing must be absent on both sides.
  pub async fn enroll(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    grade: Option<Grade>,
  ) -> Result<Student> {
    let student = self
      .run("enroll", move |docs| {
        let student = require_exists::<Student>(docs, student_id)?;
        let subject = require_exists::<Subject>(docs, subject_id)?;
        require_relation_state(&student, subject_id, false)?;
        require_relation_state(&subject, student_id, false)?;

        let student =
          relation::push_enrollment(docs, student_id, Enrollment::new(subject_id, grade))?;
        relation::add_student_to_subjects(docs, student_id, &[subject_id])?;
        Ok(student)
      })
      .await?;
    info!(student = %student_id, subject = %subject_id, "student enrolled");
    Ok(student)
  }

  /// Set the grade of an existing enrollment.
  pub async fn update_grade(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    grade: Grade,
  ) -> Result<Student> {
    let student = self
      .run("update_grade", move |docs| {
        let student = require_exists::<Student>(docs, student_id)?;
        require_exists::<Subject>(docs, subject_id)?;
        require_relation_state(&student, subject_id, true)?;

        relation::set_grade(docs, student_id, subject_id, Some(grade))
      })
      .await?;
    info!(student = %student_id, subject = %subject_id, grade = grade.value(), "grade updated");
    Ok(student)
  }

  /// Remove a student from a subject, on both sides.
  pub async fn unenroll(&self, student_id: Uuid, subject_id: Uuid) -> Result<Student> {
    let student = self
      .run("unenroll", move |docs| {
        let student = require_exists::<Student>(docs, student_id)?;
        require_relation_state(&student, subject_id, true)?;

        let student = relation::pull_enrollment(docs, student_id, subject_id)?;
        relation::pull_student_from_subjects(docs, student_id, &[subject_id])?;
        Ok(student)
      })
      .await?;
    info!(student = %student_id, subject = %subject_id, "student unenrolled");
    Ok(student)
  }

  // ── Deletion ──────────────────────────────────────────────────────────

  /// Remove the student record and every subject's reference to it. Returns
  /// the deleted record.
  pub async fn hard_delete_student(&self, id: Uuid) -> Result<Student> {
    let (student, purged) = self
      .run("hard_delete_student", move |docs| {
        let student = docs.delete_student(id)?.ok_or(Error::StudentNotFound(id))?;
        let purged = relation::purge_student(docs, id)?;
        Ok((student, purged))
      })
      .await?;
    info!(student = %id, subjects = purged.modified, "student deleted");
    Ok(student)
  }

  /// Deactivate a student. Its enrollments are dropped on both sides.
  pub async fn soft_delete_student(&self, id: Uuid) -> Result<Student> {
    let student = self
      .run("soft_delete_student", move |docs| {
        let student = require_exists::<Student>(docs, id)?;
        relation::purge_student(docs, id)?;
        if !student.enrollments.is_empty() {
          relation::clear_enrollments(docs, id)?;
        }
        docs
          .update_student(id, &StudentUpdate::Fields(StudentPatch::deactivate()))?
          .ok_or(Error::StudentNotFound(id))
      })
      .await?;
    info!(student = %id, "student deactivated");
    Ok(student)
  }
}
