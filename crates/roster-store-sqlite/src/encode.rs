//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, birth dates as `YYYY-MM-DD`,
//! UUIDs as hyphenated lowercase strings and relation lists as compact JSON
//! arrays.

use chrono::{DateTime, NaiveDate, Utc};
use roster_core::{
  student::{Enrollment, Student},
  subject::Subject,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// A JSON array of ids, bound as a single parameter and expanded in SQL with
/// `json_each`.
pub fn encode_uuid_list(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Relation lists ──────────────────────────────────────────────────────────

pub fn encode_enrollment(e: &Enrollment) -> Result<String> { Ok(serde_json::to_string(e)?) }

pub fn encode_enrollments(es: &[Enrollment]) -> Result<String> {
  Ok(serde_json::to_string(es)?)
}

pub fn decode_enrollments(s: &str) -> Result<Vec<Enrollment>> { Ok(serde_json::from_str(s)?) }

pub fn decode_uuid_list(s: &str) -> Result<Vec<Uuid>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const STUDENT_COLUMNS: &str = "id, student_id, name, last_name, birth_date, \
                                   student_group, enrollments, active, created_at, updated_at";

pub const SUBJECT_COLUMNS: &str =
  "id, name, enrolled_students, active, created_at, updated_at";

/// Raw values read directly from a `students` row.
pub struct RawStudent {
  pub id:            String,
  pub student_id:    u32,
  pub name:          String,
  pub last_name:     String,
  pub birth_date:    String,
  pub student_group: Option<String>,
  pub enrollments:   String,
  pub active:        bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawStudent {
  /// Read a row selected with [`STUDENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      student_id:    row.get(1)?,
      name:          row.get(2)?,
      last_name:     row.get(3)?,
      birth_date:    row.get(4)?,
      student_group: row.get(5)?,
      enrollments:   row.get(6)?,
      active:        row.get(7)?,
      created_at:    row.get(8)?,
      updated_at:    row.get(9)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:          decode_uuid(&self.id)?,
      student_id:  self.student_id,
      name:        self.name,
      last_name:   self.last_name,
      birth_date:  decode_date(&self.birth_date)?,
      group:       self.student_group,
      enrollments: decode_enrollments(&self.enrollments)?,
      active:      self.active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `subjects` row.
pub struct RawSubject {
  pub id:                String,
  pub name:              String,
  pub enrolled_students: String,
  pub active:            bool,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawSubject {
  /// Read a row selected with [`SUBJECT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      name:              row.get(1)?,
      enrolled_students: row.get(2)?,
      active:            row.get(3)?,
      created_at:        row.get(4)?,
      updated_at:        row.get(5)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      id:                decode_uuid(&self.id)?,
      name:              self.name,
      enrolled_students: decode_uuid_list(&self.enrolled_students)?,
      active:            self.active,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}
