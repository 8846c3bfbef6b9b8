//! [`SqliteDocuments`]: the [`Documents`] operations over an open SQLite
//! transaction.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params_from_iter, types::Value};
use roster_core::{
  filter::{StudentFilter, SubjectFilter},
  store::{Documents, Selector, StudentUpdate, SubjectUpdate, UpdateCount},
  student::Student,
  subject::Subject,
};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawStudent, RawSubject, STUDENT_COLUMNS, SUBJECT_COLUMNS, encode_date, encode_dt,
    encode_enrollments, encode_uuid, encode_uuid_list,
  },
  query::{self, Fragment, UpdatePlan},
};

/// Both collections, borrowed from the connection (or transaction) that the
/// caller will commit or roll back.
pub struct SqliteDocuments<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteDocuments<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn select_students(&self, filter: Fragment, order: &str) -> Result<Vec<Student>> {
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE {} {order}", filter.sql);
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map(params_from_iter(filter.params.iter()), RawStudent::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawStudent::into_student).collect()
  }

  fn select_subjects(&self, filter: Fragment) -> Result<Vec<Subject>> {
    let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE {}", filter.sql);
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map(params_from_iter(filter.params.iter()), RawSubject::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  fn count(&self, table: &str, filter: &Fragment) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {}", filter.sql);
    let n: i64 =
      self.conn.query_row(&sql, params_from_iter(filter.params.iter()), |r| r.get(0))?;
    Ok(n as usize)
  }

  /// Run every step of `plan` against the rows of `table` selected by
  /// `selector`, touching `updated_at` on each changed row.
  fn apply(&self, table: &str, selector: Fragment, plan: UpdatePlan) -> Result<UpdateCount> {
    let matched = self.count(table, &selector)?;
    if matched == 0 {
      return Ok(UpdateCount::default());
    }

    let counted = match &plan.changes {
      Some(changes) => {
        let both = Fragment::new(
          format!("({}) AND ({})", selector.sql, changes.sql),
          selector.params.iter().chain(&changes.params).cloned().collect(),
        );
        Some(self.count(table, &both)?)
      }
      None => None,
    };

    let now = Value::Text(encode_dt(Utc::now()));
    let mut modified = 0;
    for step in plan.steps.into_iter().filter(|s| !s.sets.is_empty()) {
      let sets = step.sets.iter().map(|f| f.sql.as_str()).collect::<Vec<_>>().join(", ");
      let mut sql = format!("UPDATE {table} SET {sets}, updated_at = ? WHERE ({})", selector.sql);
      let mut params: Vec<Value> = step.sets.into_iter().flat_map(|f| f.params).collect();
      params.push(now.clone());
      params.extend(selector.params.iter().cloned());
      if let Some(guard) = step.guard {
        sql.push_str(&format!(" AND ({})", guard.sql));
        params.extend(guard.params);
      }
      modified += self.conn.execute(&sql, params_from_iter(params.iter()))?;
    }

    Ok(UpdateCount { matched, modified: counted.unwrap_or(modified) })
  }

  fn student_by_id(&self, id: Uuid) -> Result<Option<Student>> {
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1");
    let raw = self
      .conn
      .query_row(&sql, [encode_uuid(id)], RawStudent::from_row)
      .optional()?;
    raw.map(RawStudent::into_student).transpose()
  }

  fn subject_by_id(&self, id: Uuid) -> Result<Option<Subject>> {
    let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1");
    let raw = self
      .conn
      .query_row(&sql, [encode_uuid(id)], RawSubject::from_row)
      .optional()?;
    raw.map(RawSubject::into_subject).transpose()
  }

  fn insert_student_rows(&self, students: &[Student]) -> Result<()> {
    let mut stmt = self.conn.prepare(&format!(
      "INSERT INTO students ({STUDENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    ))?;
    for s in students {
      stmt.execute(rusqlite::params![
        encode_uuid(s.id),
        s.student_id,
        s.name,
        s.last_name,
        encode_date(s.birth_date),
        s.group,
        encode_enrollments(&s.enrollments)?,
        s.active,
        encode_dt(s.created_at),
        encode_dt(s.updated_at),
      ])?;
    }
    Ok(())
  }

  fn insert_subject_rows(&self, subjects: &[Subject]) -> Result<()> {
    let mut stmt = self.conn.prepare(&format!(
      "INSERT INTO subjects ({SUBJECT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    ))?;
    for s in subjects {
      stmt.execute(rusqlite::params![
        encode_uuid(s.id),
        s.name,
        encode_uuid_list(&s.enrolled_students)?,
        s.active,
        encode_dt(s.created_at),
        encode_dt(s.updated_at),
      ])?;
    }
    Ok(())
  }
}

impl Documents for SqliteDocuments<'_> {
  // ── Students ──────────────────────────────────────────────────────────────

  fn find_students(&self, filter: &StudentFilter) -> roster_core::Result<Vec<Student>> {
    let filter = query::student_filter(filter)?;
    Ok(self.select_students(filter, "ORDER BY student_id ASC, created_at ASC")?)
  }

  fn student(&self, id: Uuid) -> roster_core::Result<Option<Student>> {
    Ok(self.student_by_id(id)?)
  }

  fn students(&self, ids: &[Uuid]) -> roster_core::Result<Vec<Student>> {
    let selector = query::student_selector(&Selector::Ids(ids.to_vec()))?;
    Ok(self.select_students(selector, "")?)
  }

  fn insert_students(&self, students: &[Student]) -> roster_core::Result<()> {
    Ok(self.insert_student_rows(students)?)
  }

  fn update_student(
    &self,
    id: Uuid,
    update: &StudentUpdate,
  ) -> roster_core::Result<Option<Student>> {
    let count = self.apply("students", query::by_id(id), query::student_update(update)?)?;
    if count.matched == 0 {
      return Ok(None);
    }
    Ok(self.student_by_id(id)?)
  }

  fn update_students(
    &self,
    selector: &Selector,
    update: &StudentUpdate,
  ) -> roster_core::Result<UpdateCount> {
    let selector = query::student_selector(selector)?;
    Ok(self.apply("students", selector, query::student_update(update)?)?)
  }

  fn delete_student(&self, id: Uuid) -> roster_core::Result<Option<Student>> {
    let Some(student) = self.student_by_id(id)? else {
      return Ok(None);
    };
    self
      .conn
      .execute("DELETE FROM students WHERE id = ?1", [encode_uuid(id)])
      .map_err(crate::Error::from)?;
    Ok(Some(student))
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  fn find_subjects(&self, filter: &SubjectFilter) -> roster_core::Result<Vec<Subject>> {
    let filter = query::subject_filter(filter)?;
    Ok(self.select_subjects(filter)?)
  }

  fn subject(&self, id: Uuid) -> roster_core::Result<Option<Subject>> {
    Ok(self.subject_by_id(id)?)
  }

  fn subjects(&self, ids: &[Uuid]) -> roster_core::Result<Vec<Subject>> {
    let selector = query::subject_selector(&Selector::Ids(ids.to_vec()))?;
    Ok(self.select_subjects(selector)?)
  }

  fn insert_subjects(&self, subjects: &[Subject]) -> roster_core::Result<()> {
    Ok(self.insert_subject_rows(subjects)?)
  }

  fn update_subject(
    &self,
    id: Uuid,
    update: &SubjectUpdate,
  ) -> roster_core::Result<Option<Subject>> {
    let count = self.apply("subjects", query::by_id(id), query::subject_update(update)?)?;
    if count.matched == 0 {
      return Ok(None);
    }
    Ok(self.subject_by_id(id)?)
  }

  fn update_subjects(
    &self,
    selector: &Selector,
    update: &SubjectUpdate,
  ) -> roster_core::Result<UpdateCount> {
    let selector = query::subject_selector(selector)?;
    Ok(self.apply("subjects", selector, query::subject_update(update)?)?)
  }

  fn delete_subject(&self, id: Uuid) -> roster_core::Result<Option<Subject>> {
    let Some(subject) = self.subject_by_id(id)? else {
      return Ok(None);
    };
    self
      .conn
      .execute("DELETE FROM subjects WHERE id = ?1", [encode_uuid(id)])
      .map_err(crate::Error::from)?;
    Ok(Some(subject))
  }
}
