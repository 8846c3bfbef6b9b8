//! Read-only precondition checks run before any mutation.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
  Error, Result,
  error::EntityKind,
  store::Documents,
  student::{Enrollment, Student},
  subject::Subject,
};

// ─── Entity abstraction ──────────────────────────────────────────────────────

/// A document in one of the two collections.
pub trait Entity: Sized {
  const KIND: EntityKind;

  fn id(&self) -> Uuid;

  fn fetch(docs: &dyn Documents, id: Uuid) -> Result<Option<Self>>;

  fn fetch_many(docs: &dyn Documents, ids: &[Uuid]) -> Result<Vec<Self>>;

  fn not_found(id: Uuid) -> Error;
}

/// An entity holding references to the opposite collection.
pub trait Related: Entity {
  /// Kind of the entities referenced.
  const COUNTERPART: EntityKind;

  type Entry;

  fn entries(&self) -> &[Self::Entry];

  fn entry_ref(entry: &Self::Entry) -> Uuid;
}

impl Entity for Student {
  const KIND: EntityKind = EntityKind::Student;

  fn id(&self) -> Uuid { self.id }

  fn fetch(docs: &dyn Documents, id: Uuid) -> Result<Option<Self>> { docs.student(id) }

  fn fetch_many(docs: &dyn Documents, ids: &[Uuid]) -> Result<Vec<Self>> {
    docs.students(ids)
  }

  fn not_found(id: Uuid) -> Error { Error::StudentNotFound(id) }
}

impl Related for Student {
  const COUNTERPART: EntityKind = EntityKind::Subject;

  type Entry = Enrollment;

  fn entries(&self) -> &[Enrollment] { &self.enrollments }

  fn entry_ref(entry: &Enrollment) -> Uuid { entry.subject_id }
}

impl Entity for Subject {
  const KIND: EntityKind = EntityKind::Subject;

  fn id(&self) -> Uuid { self.id }

  fn fetch(docs: &dyn Documents, id: Uuid) -> Result<Option<Self>> { docs.subject(id) }

  fn fetch_many(docs: &dyn Documents, ids: &[Uuid]) -> Result<Vec<Self>> {
    docs.subjects(ids)
  }

  fn not_found(id: Uuid) -> Error { Error::SubjectNotFound(id) }
}

impl Related for Subject {
  const COUNTERPART: EntityKind = EntityKind::Student;

  type Entry = Uuid;

  fn entries(&self) -> &[Uuid] { &self.enrolled_students }

  fn entry_ref(entry: &Uuid) -> Uuid { *entry }
}

// ─── Checks ──────────────────────────────────────────────────────────────────

/// Fetch an entity, failing with the kind's not-found error if absent.
pub fn require_exists<E: Entity>(docs: &dyn Documents, id: Uuid) -> Result<E> {
  E::fetch(docs, id)?.ok_or_else(|| E::not_found(id))
}

/// Fetch every entity in `ids`.
///
/// Fails on an empty input, and otherwise reports every requested id that
/// was not found, in input order.
pub fn require_all_exist<E: Entity>(docs: &dyn Documents, ids: &[Uuid]) -> Result<Vec<E>> {
  if ids.is_empty() {
    return Err(Error::EmptyBatch(E::KIND));
  }

  let found = E::fetch_many(docs, ids)?;
  let found_ids: HashSet<Uuid> = found.iter().map(Entity::id).collect();
  let missing: Vec<Uuid> = ids.iter().copied().filter(|id| !found_ids.contains(id)).collect();

  if missing.is_empty() {
    Ok(found)
  } else {
    Err(Error::MissingIds { kind: E::KIND, ids: missing })
  }
}

/// Fail if any id occurs more than once.
pub fn require_distinct(kind: EntityKind, ids: &[Uuid]) -> Result<()> {
  let mut seen = HashSet::with_capacity(ids.len());
  match ids.iter().find(|id| !seen.insert(**id)) {
    Some(&id) => Err(Error::DuplicateReference { kind, id }),
    None => Ok(()),
  }
}

/// Check whether `entity` references `counterpart_id`.
///
/// With `expected_present`, absence fails with [`Error::RelationMissing`];
/// without it, presence fails with [`Error::RelationExists`]. Returns the
/// entry found, if any.
pub fn require_relation_state<E: Related>(
  entity: &E,
  counterpart_id: Uuid,
  expected_present: bool,
) -> Result<Option<&E::Entry>> {
  let found = entity.entries().iter().find(|e| E::entry_ref(e) == counterpart_id);

  match (found.is_some(), expected_present) {
    (true, false) => Err(Error::RelationExists {
      owner: E::KIND,
      owner_id: entity.id(),
      counterpart: E::COUNTERPART,
      counterpart_id,
    }),
    (false, true) => Err(Error::RelationMissing {
      owner: E::KIND,
      owner_id: entity.id(),
      counterpart: E::COUNTERPART,
      counterpart_id,
    }),
    _ => Ok(found),
  }
}
