//! Subjects (courses) and the set of students enrolled in them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
  pub id:                Uuid,
  pub name:              String,
  /// Weak references to students; never contains duplicates.
  pub enrolled_students: Vec<Uuid>,
  pub active:            bool,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl Subject {
  pub fn has_student(&self, student_id: Uuid) -> bool {
    self.enrolled_students.contains(&student_id)
  }
}

#[derive(Debug, Clone)]
pub struct NewSubject {
  pub name:              String,
  pub enrolled_students: Vec<Uuid>,
  pub active:            bool,
}

impl NewSubject {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), enrolled_students: Vec::new(), active: true }
  }

  pub(crate) fn into_subject(self, now: DateTime<Utc>) -> Subject {
    Subject {
      id:                Uuid::new_v4(),
      name:              self.name,
      enrolled_students: self.enrolled_students,
      active:            self.active,
      created_at:        now,
      updated_at:        now,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectPatch {
  pub name:   Option<String>,
  pub active: Option<bool>,
}

impl SubjectPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  pub fn deactivate() -> Self {
    Self { active: Some(false), ..Self::default() }
  }
}
