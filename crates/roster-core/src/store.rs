//! The document-store boundary.
//!
//! [`Documents`] is the set of operations available inside one transaction;
//! [`RosterStore`] opens that transaction. Backends (e.g.
//! `roster-store-sqlite`) implement both. The store enforces no referential
//! integrity between the two collections: that is the job of the
//! [`Roster`](crate::roster::Roster) orchestrators.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  filter::{StudentFilter, SubjectFilter},
  student::{Enrollment, Grade, Student, StudentPatch},
  subject::{Subject, SubjectPatch},
};

// ─── Update descriptions ─────────────────────────────────────────────────────

/// A targeted partial update of a student document.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentUpdate {
  /// Overwrite the provided scalar fields.
  Fields(StudentPatch),
  /// Append an enrollment unless one for the same subject is present.
  PushEnrollment(Enrollment),
  /// Remove the enrollment for this subject.
  PullEnrollment(Uuid),
  /// Set the grade on the enrollment for `subject_id`.
  SetGrade { subject_id: Uuid, grade: Option<Grade> },
  ClearEnrollments,
}

/// A targeted partial update of a subject document.
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectUpdate {
  Fields(SubjectPatch),
  /// Add each student id that is not already present.
  AddStudents(Vec<Uuid>),
  PullStudents(Vec<Uuid>),
  ClearStudents,
}

/// Which documents a multi-document update applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
  Ids(Vec<Uuid>),
  /// Every document whose relation list mentions this counterpart id.
  Referencing(Uuid),
}

/// Outcome of a multi-document update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCount {
  pub matched:  usize,
  pub modified: usize,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Operations on both collections, scoped to an open transaction. Nothing
/// here commits; the enclosing [`RosterStore::transaction`] does.
pub trait Documents {
  // ── Students ──────────────────────────────────────────────────────────

  fn find_students(&self, filter: &StudentFilter) -> Result<Vec<Student>>;

  fn student(&self, id: Uuid) -> Result<Option<Student>>;

  /// The students among `ids` that exist, in no particular order.
  fn students(&self, ids: &[Uuid]) -> Result<Vec<Student>>;

  fn insert_students(&self, students: &[Student]) -> Result<()>;

  /// Apply `update` and return the updated document, or `None` if `id` does
  /// not exist.
  fn update_student(&self, id: Uuid, update: &StudentUpdate) -> Result<Option<Student>>;

  fn update_students(&self, selector: &Selector, update: &StudentUpdate) -> Result<UpdateCount>;

  /// Remove the document and return it, or `None` if it did not exist.
  fn delete_student(&self, id: Uuid) -> Result<Option<Student>>;

  // ── Subjects ──────────────────────────────────────────────────────────

  fn find_subjects(&self, filter: &SubjectFilter) -> Result<Vec<Subject>>;

  fn subject(&self, id: Uuid) -> Result<Option<Subject>>;

  fn subjects(&self, ids: &[Uuid]) -> Result<Vec<Subject>>;

  fn insert_subjects(&self, subjects: &[Subject]) -> Result<()>;

  fn update_subject(&self, id: Uuid, update: &SubjectUpdate) -> Result<Option<Subject>>;

  fn update_subjects(&self, selector: &Selector, update: &SubjectUpdate) -> Result<UpdateCount>;

  fn delete_subject(&self, id: Uuid) -> Result<Option<Subject>>;
}

/// A transactional store holding the `students` and `subjects` collections.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RosterStore: Send + Sync {
  /// Run `work` inside one transaction spanning both collections.
  ///
  /// The transaction commits if `work` returns `Ok` and is aborted if it
  /// returns `Err`; in that case none of its writes are observable. Write
  /// conflicts surface as errors and are not retried.
  fn transaction<T, F>(&self, work: F) -> impl Future<Output = Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> Result<T> + Send + 'static;

  /// Run read-only `work` against one consistent snapshot of both
  /// collections. Unlike [`transaction`](Self::transaction) this does not
  /// exclude concurrent writers; `work` must not write.
  fn read<T, F>(&self, work: F) -> impl Future<Output = Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> Result<T> + Send + 'static;
}
