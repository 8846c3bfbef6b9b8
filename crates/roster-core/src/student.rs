//! Students and their embedded enrollment list.
//!
//! A student owns its enrollments: each entry names a subject (a weak
//! reference, not ownership) and carries an optional grade. The matching
//! subject lists the student's id in its `enrolled_students`; the
//! [`Roster`](crate::roster::Roster) keeps both sides in step.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Grade ───────────────────────────────────────────────────────────────────

/// A grade in `0..=100`. An ungraded enrollment holds no `Grade` at all.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Grade(f64);

impl Grade {
  pub const MIN: f64 = 0.0;
  pub const MAX: f64 = 100.0;

  pub fn new(value: f64) -> Result<Self> {
    if (Self::MIN..=Self::MAX).contains(&value) {
      Ok(Self(value))
    } else {
      Err(Error::InvalidGrade(value))
    }
  }

  pub fn value(self) -> f64 { self.0 }
}

impl TryFrom<f64> for Grade {
  type Error = Error;

  fn try_from(value: f64) -> Result<Self> { Self::new(value) }
}

impl From<Grade> for f64 {
  fn from(g: Grade) -> Self { g.0 }
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

/// One entry of a student's enrollment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
  pub subject_id: Uuid,
  #[serde(default)]
  pub grade:      Option<Grade>,
}

impl Enrollment {
  pub fn new(subject_id: Uuid, grade: Option<Grade>) -> Self {
    Self { subject_id, grade }
  }

  pub fn ungraded(subject_id: Uuid) -> Self { Self::new(subject_id, None) }
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
  pub id:          Uuid,
  /// Institution-assigned number. Not unique.
  pub student_id:  u32,
  pub name:        String,
  pub last_name:   String,
  pub birth_date:  NaiveDate,
  /// `None` means the student has not been assigned to a group.
  pub group:       Option<String>,
  pub enrollments: Vec<Enrollment>,
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Student {
  pub fn enrollment(&self, subject_id: Uuid) -> Option<&Enrollment> {
    self.enrollments.iter().find(|e| e.subject_id == subject_id)
  }

  pub fn is_enrolled_in(&self, subject_id: Uuid) -> bool {
    self.enrollment(subject_id).is_some()
  }

  pub fn subject_ids(&self) -> Vec<Uuid> {
    self.enrollments.iter().map(|e| e.subject_id).collect()
  }
}

/// Input for creating a student. The id and timestamps are assigned on
/// insertion.
#[derive(Debug, Clone)]
pub struct NewStudent {
  pub student_id:  u32,
  pub name:        String,
  pub last_name:   String,
  pub birth_date:  NaiveDate,
  pub group:       Option<String>,
  pub enrollments: Vec<Enrollment>,
  pub active:      bool,
}

impl NewStudent {
  pub fn new(
    student_id: u32,
    name: impl Into<String>,
    last_name: impl Into<String>,
    birth_date: NaiveDate,
  ) -> Self {
    Self {
      student_id,
      name: name.into(),
      last_name: last_name.into(),
      birth_date,
      group: None,
      enrollments: Vec::new(),
      active: true,
    }
  }

  pub(crate) fn into_student(self, now: DateTime<Utc>) -> Student {
    Student {
      id:          Uuid::new_v4(),
      student_id:  self.student_id,
      name:        self.name,
      last_name:   self.last_name,
      birth_date:  self.birth_date,
      group:       self.group,
      enrollments: self.enrollments,
      active:      self.active,
      created_at:  now,
      updated_at:  now,
    }
  }
}

/// A partial update of a student's own fields. `None` leaves the field as it
/// is. Enrollments are not reachable from here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentPatch {
  pub student_id: Option<u32>,
  pub name:       Option<String>,
  pub last_name:  Option<String>,
  pub birth_date: Option<NaiveDate>,
  pub group:      Option<String>,
  pub active:     Option<bool>,
}

impl StudentPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  pub fn deactivate() -> Self {
    Self { active: Some(false), ..Self::default() }
  }
}
