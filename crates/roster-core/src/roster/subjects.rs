//! Subject-side orchestrators.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::Roster;
use crate::{
  Error, Result,
  error::EntityKind,
  filter::SubjectFilter,
  guard::{self, require_exists, require_relation_state},
  relation,
  store::{Documents, RosterStore, SubjectUpdate},
  student::Student,
  subject::{NewSubject, Subject, SubjectPatch},
};

fn insert_subjects(docs: &dyn Documents, inputs: Vec<NewSubject>) -> Result<Vec<Subject>> {
  let now = Utc::now();
  let subjects: Vec<Subject> = inputs.into_iter().map(|input| input.into_subject(now)).collect();

  for subject in subjects.iter().filter(|s| !s.enrolled_students.is_empty()) {
    guard::require_distinct(EntityKind::Student, &subject.enrolled_students)?;
    guard::require_all_exist::<Student>(docs, &subject.enrolled_students)?;
  }

  docs.insert_subjects(&subjects)?;

  for subject in subjects.iter().filter(|s| !s.enrolled_students.is_empty()) {
    relation::push_subject_to_students(docs, subject.id, &subject.enrolled_students)?;
  }

  Ok(subjects)
}

impl<S: RosterStore> Roster<S> {
  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_subject(&self, id: Uuid) -> Result<Subject> {
    self.read("get_subject", move |docs| require_exists::<Subject>(docs, id)).await
  }

  pub async fn find_subjects(&self, filter: SubjectFilter) -> Result<Vec<Subject>> {
    self.read("find_subjects", move |docs| docs.find_subjects(&filter)).await
  }

  // ── Creation ──────────────────────────────────────────────────────────

  /// Insert a subject. Each initial student must exist and gains an
  /// ungraded enrollment.
  pub async fn create_subject(&self, input: NewSubject) -> Result<Subject> {
    let subject = self
      .run("create_subject", move |docs| {
        let mut created = insert_subjects(docs, vec![input])?;
        Ok(created.remove(0))
      })
      .await?;
    info!(subject = %subject.id, students = subject.enrolled_students.len(), "subject created");
    Ok(subject)
  }

  pub async fn create_subjects(&self, inputs: Vec<NewSubject>) -> Result<Vec<Subject>> {
    let subjects = self
      .run("create_subjects", move |docs| insert_subjects(docs, inputs))
      .await?;
    info!(count = subjects.len(), "subjects created");
    Ok(subjects)
  }

  // ── Updates ───────────────────────────────────────────────────────────

  pub async fn update_subject(&self, id: Uuid, patch: SubjectPatch) -> Result<Subject> {
    let subject = self
      .run("update_subject", move |docs| {
        let current = require_exists::<Subject>(docs, id)?;
        if patch.is_empty() {
          return Ok(current);
        }
        docs
          .update_subject(id, &SubjectUpdate::Fields(patch))?
          .ok_or(Error::SubjectNotFound(id))
      })
      .await?;
    info!(subject = %id, "subject updated");
    Ok(subject)
  }

  /// Enroll a batch of students in one subject.
  ///
  /// The whole batch is validated first: it must be non-empty and free of
  /// duplicates, every student must exist, and none may already be paired
  /// with the subject on either side. One bad id aborts everything.
  pub async fn add_students(&self, subject_id: Uuid, student_ids: Vec<Uuid>) -> Result<Subject> {
    let count = student_ids.len();
    let subject = self
      .run("add_students", move |docs| {
        let subject = require_exists::<Subject>(docs, subject_id)?;
        let students = guard::require_all_exist::<Student>(docs, &student_ids)?;
        guard::require_distinct(EntityKind::Student, &student_ids)?;
        for student in &students {
          require_relation_state(&subject, student.id, false)?;
          require_relation_state(student, subject_id, false)?;
        }

        relation::push_subject_to_students(docs, subject_id, &student_ids)?;
        relation::add_students_to_subject(docs, subject_id, &student_ids)
      })
      .await?;
    info!(subject = %subject_id, count, "students added to subject");
    Ok(subject)
  }

  /// Unenroll a batch of students from one subject, validating the whole
  /// batch before any write.
  pub async fn remove_students(
    &self,
    subject_id: Uuid,
    student_ids: Vec<Uuid>,
  ) -> Result<Subject> {
    let count = student_ids.len();
    let subject = self
      .run("remove_students", move |docs| {
        let subject = require_exists::<Subject>(docs, subject_id)?;
        guard::require_all_exist::<Student>(docs, &student_ids)?;
        guard::require_distinct(EntityKind::Student, &student_ids)?;
        for &student_id in &student_ids {
          require_relation_state(&subject, student_id, true)?;
        }

        relation::pull_subject_from_students(docs, subject_id, &student_ids)?;
        relation::pull_students_from_subject(docs, subject_id, &student_ids)
      })
      .await?;
    info!(subject = %subject_id, count, "students removed from subject");
    Ok(subject)
  }

  // ── Deletion ──────────────────────────────────────────────────────────

  /// Remove the subject record and every student's enrollment in it.
  /// Grades for other subjects are untouched.
  pub async fn hard_delete_subject(&self, id: Uuid) -> Result<Subject> {
    let (subject, purged) = self
      .run("hard_delete_subject", move |docs| {
        let subject = docs.delete_subject(id)?.ok_or(Error::SubjectNotFound(id))?;
        let purged = relation::purge_subject(docs, id)?;
        Ok((subject, purged))
      })
      .await?;
    info!(subject = %id, students = purged.modified, "subject deleted");
    Ok(subject)
  }

  /// Deactivate a subject, dropping every enrollment in it.
  pub async fn soft_delete_subject(&self, id: Uuid) -> Result<Subject> {
    let subject = self
      .run("soft_delete_subject", move |docs| {
        let subject = require_exists::<Subject>(docs, id)?;
        relation::purge_subject(docs, id)?;
        if !subject.enrolled_students.is_empty() {
          relation::clear_students(docs, id)?;
        }
        docs
          .update_subject(id, &SubjectUpdate::Fields(SubjectPatch::deactivate()))?
          .ok_or(Error::SubjectNotFound(id))
      })
      .await?;
    info!(subject = %id, "subject deactivated");
    Ok(subject)
  }
}
