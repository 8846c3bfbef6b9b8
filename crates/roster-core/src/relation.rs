//! Relationship mutators.
//!
//! Each function is a single-collection partial update run inside the
//! caller's transaction. None of them validates preconditions (see
//! [`guard`](crate::guard)) and none commits.

use uuid::Uuid;

use crate::{
  Result,
  guard::Entity,
  store::{Documents, Selector, StudentUpdate, SubjectUpdate, UpdateCount},
  student::{Enrollment, Grade, Student},
  subject::Subject,
};

fn updated<E: Entity>(id: Uuid, doc: Option<E>) -> Result<E> {
  doc.ok_or_else(|| E::not_found(id))
}

// ─── Student side ────────────────────────────────────────────────────────────

/// Append one enrollment to one student.
pub fn push_enrollment(
  docs: &dyn Documents,
  student_id: Uuid,
  enrollment: Enrollment,
) -> Result<Student> {
  updated(student_id, docs.update_student(student_id, &StudentUpdate::PushEnrollment(enrollment))?)
}

/// Append an ungraded enrollment for `subject_id` to each student.
pub fn push_subject_to_students(
  docs: &dyn Documents,
  subject_id: Uuid,
  student_ids: &[Uuid],
) -> Result<UpdateCount> {
  docs.update_students(
    &Selector::Ids(student_ids.to_vec()),
    &StudentUpdate::PushEnrollment(Enrollment::ungraded(subject_id)),
  )
}

pub fn set_grade(
  docs: &dyn Documents,
  student_id: Uuid,
  subject_id: Uuid,
  grade: Option<Grade>,
) -> Result<Student> {
  updated(
    student_id,
    docs.update_student(student_id, &StudentUpdate::SetGrade { subject_id, grade })?,
  )
}

/// Remove one enrollment from one student.
pub fn pull_enrollment(docs: &dyn Documents, student_id: Uuid, subject_id: Uuid) -> Result<Student> {
  updated(student_id, docs.update_student(student_id, &StudentUpdate::PullEnrollment(subject_id))?)
}

/// Remove the enrollment for `subject_id` from each listed student.
pub fn pull_subject_from_students(
  docs: &dyn Documents,
  subject_id: Uuid,
  student_ids: &[Uuid],
) -> Result<UpdateCount> {
  docs.update_students(
    &Selector::Ids(student_ids.to_vec()),
    &StudentUpdate::PullEnrollment(subject_id),
  )
}

pub fn clear_enrollments(docs: &dyn Documents, student_id: Uuid) -> Result<Student> {
  updated(student_id, docs.update_student(student_id, &StudentUpdate::ClearEnrollments)?)
}

/// Remove `subject_id` from every student that is enrolled in it.
pub fn purge_subject(docs: &dyn Documents, subject_id: Uuid) -> Result<UpdateCount> {
  docs.update_students(
    &Selector::Referencing(subject_id),
    &StudentUpdate::PullEnrollment(subject_id),
  )
}

// ─── Subject side ────────────────────────────────────────────────────────────

/// Add `student_id` to each listed subject that does not already hold it.
pub fn add_student_to_subjects(
  docs: &dyn Documents,
  student_id: Uuid,
  subject_ids: &[Uuid],
) -> Result<UpdateCount> {
  docs.update_subjects(
    &Selector::Ids(subject_ids.to_vec()),
    &SubjectUpdate::AddStudents(vec![student_id]),
  )
}

/// Add several students to one subject, skipping those already present.
pub fn add_students_to_subject(
  docs: &dyn Documents,
  subject_id: Uuid,
  student_ids: &[Uuid],
) -> Result<Subject> {
  updated(
    subject_id,
    docs.update_subject(subject_id, &SubjectUpdate::AddStudents(student_ids.to_vec()))?,
  )
}

pub fn pull_students_from_subject(
  docs: &dyn Documents,
  subject_id: Uuid,
  student_ids: &[Uuid],
) -> Result<Subject> {
  updated(
    subject_id,
    docs.update_subject(subject_id, &SubjectUpdate::PullStudents(student_ids.to_vec()))?,
  )
}

/// Remove `student_id` from each listed subject.
pub fn pull_student_from_subjects(
  docs: &dyn Documents,
  student_id: Uuid,
  subject_ids: &[Uuid],
) -> Result<UpdateCount> {
  docs.update_subjects(
    &Selector::Ids(subject_ids.to_vec()),
    &SubjectUpdate::PullStudents(vec![student_id]),
  )
}

pub fn clear_students(docs: &dyn Documents, subject_id: Uuid) -> Result<Subject> {
  updated(subject_id, docs.update_subject(subject_id, &SubjectUpdate::ClearStudents)?)
}

/// Remove `student_id` from every subject that lists it.
pub fn purge_student(docs: &dyn Documents, student_id: Uuid) -> Result<UpdateCount> {
  docs.update_subjects(
    &Selector::Referencing(student_id),
    &SubjectUpdate::PullStudents(vec![student_id]),
  )
}
