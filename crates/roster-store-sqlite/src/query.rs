//! Compilation of typed filters, selectors and updates into SQL.
//!
//! Every fragment uses anonymous `?` placeholders; its parameters are listed
//! in the order they appear in the SQL text. Id lists are bound as a single
//! JSON array parameter and expanded with `json_each`, so statements never
//! need a variable number of placeholders.
//!
//! Relation lists are edited in place with JSON1 expressions. Rebuilt lists
//! are assembled with `group_concat` over `json_each`, which keeps array
//! order.

use rusqlite::types::Value;
use roster_core::{
  filter::{EnrollmentMatch, StudentFilter, SubjectFilter},
  store::{Selector, StudentUpdate, SubjectUpdate},
  student::StudentPatch,
  subject::SubjectPatch,
};
use uuid::Uuid;

use crate::{
  Result,
  encode::{encode_date, encode_enrollment, encode_uuid, encode_uuid_list},
};

// ─── Fragments ───────────────────────────────────────────────────────────────

/// A piece of SQL together with its parameters.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
  pub sql:    String,
  pub params: Vec<Value>,
}

impl Fragment {
  pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
    Self { sql: sql.into(), params }
  }

  /// A fragment that matches no row.
  fn none() -> Self { Self::new("0", vec![]) }
}

/// Conditions joined with `AND`.
#[derive(Debug, Default)]
pub struct Conditions {
  parts: Vec<Fragment>,
}

impl Conditions {
  pub fn push(&mut self, fragment: Fragment) { self.parts.push(fragment); }

  /// The conjunction, or `1` when there are no conditions.
  pub fn into_fragment(self) -> Fragment {
    if self.parts.is_empty() {
      return Fragment::new("1", vec![]);
    }
    let sql = self
      .parts
      .iter()
      .map(|p| format!("({})", p.sql))
      .collect::<Vec<_>>()
      .join(" AND ");
    let params = self.parts.into_iter().flat_map(|p| p.params).collect();
    Fragment { sql, params }
  }
}

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn flag(b: bool) -> Value { Value::Integer(i64::from(b)) }

fn id_list(ids: &[Uuid]) -> Result<Value> { Ok(text(encode_uuid_list(ids)?)) }

/// `column IN <json array parameter>`.
fn in_json(column: &str, list: Value) -> Fragment {
  Fragment::new(format!("{column} IN (SELECT value FROM json_each(?))"), vec![list])
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(substring: &str) -> String {
  let mut escaped = String::with_capacity(substring.len() + 2);
  escaped.push('%');
  for c in substring.chars() {
    if matches!(c, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped.push('%');
  escaped
}

/// Case-insensitive substring match against any of `patterns`. Both sides
/// go through Unicode lowercasing (`casefold`, registered on the
/// connection), since SQLite's own `LIKE` only folds ASCII.
fn like_any(column: &str, patterns: &[String]) -> Fragment {
  if patterns.is_empty() {
    return Fragment::none();
  }
  let sql = vec![format!("casefold({column}) LIKE ? ESCAPE '\\'"); patterns.len()].join(" OR ");
  Fragment::new(
    sql,
    patterns.iter().map(|p| text(like_pattern(&p.to_lowercase()))).collect(),
  )
}

// ─── Filters ─────────────────────────────────────────────────────────────────

pub fn student_filter(filter: &StudentFilter) -> Result<Fragment> {
  let mut conds = Conditions::default();

  if let Some(active) = filter.active.required() {
    conds.push(Fragment::new("active = ?", vec![flag(active)]));
  }
  if let Some(ids) = &filter.ids {
    conds.push(in_json("id", id_list(ids)?));
  }
  if let Some(numbers) = &filter.student_ids {
    conds.push(in_json("student_id", text(serde_json::to_string(numbers)?)));
  }
  if let Some(names) = &filter.names {
    conds.push(like_any("name", names));
  }
  if let Some(names) = &filter.last_names {
    conds.push(like_any("last_name", names));
  }
  if let Some(groups) = &filter.groups {
    conds.push(in_json("student_group", text(serde_json::to_string(groups)?)));
  }
  if let Some(m) = &filter.enrollment {
    conds.push(enrollment_match(m)?);
  }

  Ok(conds.into_fragment())
}

/// One `EXISTS` over the enrollment array, so that every sub-condition has to
/// hold for the same entry.
fn enrollment_match(m: &EnrollmentMatch) -> Result<Fragment> {
  let mut inner = Conditions::default();

  if let Some(ids) = &m.subject_ids {
    inner.push(in_json("json_extract(e.value, '$.subject_id')", id_list(ids)?));
  }
  if let Some(grade) = m.grade {
    inner.push(Fragment::new("json_extract(e.value, '$.grade') = ?", vec![Value::Real(grade)]));
  }
  if let Some(min) = m.grade_min {
    inner.push(Fragment::new("json_extract(e.value, '$.grade') >= ?", vec![Value::Real(min)]));
  }
  if let Some(max) = m.grade_max {
    inner.push(Fragment::new("json_extract(e.value, '$.grade') <= ?", vec![Value::Real(max)]));
  }

  let inner = inner.into_fragment();
  Ok(Fragment::new(
    format!("EXISTS (SELECT 1 FROM json_each(students.enrollments) AS e WHERE {})", inner.sql),
    inner.params,
  ))
}

pub fn subject_filter(filter: &SubjectFilter) -> Result<Fragment> {
  let mut conds = Conditions::default();

  if let Some(active) = filter.active.required() {
    conds.push(Fragment::new("active = ?", vec![flag(active)]));
  }
  if let Some(ids) = &filter.ids {
    conds.push(in_json("id", id_list(ids)?));
  }
  if let Some(names) = &filter.names {
    conds.push(like_any("name", names));
  }
  if let Some(students) = &filter.student_ids {
    conds.push(Fragment::new(
      "EXISTS (SELECT 1 FROM json_each(subjects.enrolled_students) AS e \
       WHERE e.value IN (SELECT value FROM json_each(?)))",
      vec![id_list(students)?],
    ));
  }

  Ok(conds.into_fragment())
}

// ─── Selectors ───────────────────────────────────────────────────────────────

pub fn by_id(id: Uuid) -> Fragment { Fragment::new("id = ?", vec![text(encode_uuid(id))]) }

pub fn student_selector(selector: &Selector) -> Result<Fragment> {
  Ok(match selector {
    Selector::Ids(ids) => in_json("id", id_list(ids)?),
    Selector::Referencing(subject_id) => Fragment::new(
      "EXISTS (SELECT 1 FROM json_each(students.enrollments) AS r \
       WHERE json_extract(r.value, '$.subject_id') = ?)",
      vec![text(encode_uuid(*subject_id))],
    ),
  })
}

pub fn subject_selector(selector: &Selector) -> Result<Fragment> {
  Ok(match selector {
    Selector::Ids(ids) => in_json("id", id_list(ids)?),
    Selector::Referencing(student_id) => Fragment::new(
      "EXISTS (SELECT 1 FROM json_each(subjects.enrolled_students) AS r WHERE r.value = ?)",
      vec![text(encode_uuid(*student_id))],
    ),
  })
}

// ─── Updates ─────────────────────────────────────────────────────────────────

/// One `UPDATE` statement: its `SET` list plus an optional extra `WHERE`
/// condition that skips rows the statement would leave unchanged.
#[derive(Debug, Default)]
pub struct Step {
  pub sets:  Vec<Fragment>,
  pub guard: Option<Fragment>,
}

/// The statements implementing one logical update, run in order.
///
/// With a single step, the rows it changes are the modified documents. With
/// several, `changes` selects the rows that will be modified, counted before
/// any step runs.
#[derive(Debug, Default)]
pub struct UpdatePlan {
  pub steps:   Vec<Step>,
  pub changes: Option<Fragment>,
}

impl UpdatePlan {
  fn single(sets: Vec<Fragment>, guard: Option<Fragment>) -> Self {
    Self { steps: vec![Step { sets, guard }], changes: None }
  }
}

pub fn student_update(update: &StudentUpdate) -> Result<UpdatePlan> {
  Ok(match update {
    StudentUpdate::Fields(patch) => UpdatePlan::single(student_fields(patch), None),

    StudentUpdate::PushEnrollment(enrollment) => UpdatePlan::single(
      vec![Fragment::new(
        "enrollments = json_insert(enrollments, '$[#]', json(?))",
        vec![text(encode_enrollment(enrollment)?)],
      )],
      Some(Fragment::new(
        "NOT EXISTS (SELECT 1 FROM json_each(students.enrollments) AS g \
         WHERE json_extract(g.value, '$.subject_id') = ?)",
        vec![text(encode_uuid(enrollment.subject_id))],
      )),
    ),

    StudentUpdate::PullEnrollment(subject_id) => {
      let id = text(encode_uuid(*subject_id));
      UpdatePlan::single(
        vec![Fragment::new(
          "enrollments = (SELECT '[' || COALESCE(group_concat(e.value, ','), '') || ']' \
           FROM json_each(students.enrollments) AS e \
           WHERE json_extract(e.value, '$.subject_id') <> ?)",
          vec![id.clone()],
        )],
        Some(Fragment::new(
          "EXISTS (SELECT 1 FROM json_each(students.enrollments) AS g \
           WHERE json_extract(g.value, '$.subject_id') = ?)",
          vec![id],
        )),
      )
    }

    StudentUpdate::SetGrade { subject_id, grade } => {
      let grade = grade.map_or(Value::Null, |g| Value::Real(g.value()));
      UpdatePlan::single(
        vec![Fragment::new(
          "enrollments = (SELECT '[' || COALESCE(group_concat(\
             CASE WHEN json_extract(e.value, '$.subject_id') = ? \
                  THEN json_set(e.value, '$.grade', ?) \
                  ELSE e.value END, ','), '') || ']' \
           FROM json_each(students.enrollments) AS e)",
          vec![text(encode_uuid(*subject_id)), grade],
        )],
        None,
      )
    }

    StudentUpdate::ClearEnrollments => UpdatePlan::single(
      vec![Fragment::new("enrollments = '[]'", vec![])],
      Some(Fragment::new("enrollments <> '[]'", vec![])),
    ),
  })
}

fn student_fields(patch: &StudentPatch) -> Vec<Fragment> {
  let mut sets = Vec::new();
  if let Some(n) = patch.student_id {
    sets.push(Fragment::new("student_id = ?", vec![Value::Integer(i64::from(n))]));
  }
  if let Some(name) = &patch.name {
    sets.push(Fragment::new("name = ?", vec![text(name.as_str())]));
  }
  if let Some(last_name) = &patch.last_name {
    sets.push(Fragment::new("last_name = ?", vec![text(last_name.as_str())]));
  }
  if let Some(d) = patch.birth_date {
    sets.push(Fragment::new("birth_date = ?", vec![text(encode_date(d))]));
  }
  if let Some(group) = &patch.group {
    sets.push(Fragment::new("student_group = ?", vec![text(group.as_str())]));
  }
  if let Some(active) = patch.active {
    sets.push(Fragment::new("active = ?", vec![flag(active)]));
  }
  sets
}

pub fn subject_update(update: &SubjectUpdate) -> Result<UpdatePlan> {
  Ok(match update {
    SubjectUpdate::Fields(patch) => UpdatePlan::single(subject_fields(patch), None),

    SubjectUpdate::AddStudents(ids) => {
      // One append per id, each skipped where the id is already listed.
      let steps = ids
        .iter()
        .map(|id| Step {
          sets:  vec![Fragment::new(
            "enrolled_students = json_insert(enrolled_students, '$[#]', ?)",
            vec![text(encode_uuid(*id))],
          )],
          guard: Some(Fragment::new(
            "NOT EXISTS (SELECT 1 FROM json_each(subjects.enrolled_students) AS g \
             WHERE g.value = ?)",
            vec![text(encode_uuid(*id))],
          )),
        })
        .collect();
      UpdatePlan {
        steps,
        changes: Some(Fragment::new(
          "EXISTS (SELECT 1 FROM json_each(?) AS n WHERE n.value NOT IN \
             (SELECT value FROM json_each(subjects.enrolled_students)))",
          vec![id_list(ids)?],
        )),
      }
    }

    SubjectUpdate::PullStudents(ids) => {
      let list = id_list(ids)?;
      UpdatePlan::single(
        vec![Fragment::new(
          "enrolled_students = (SELECT '[' || COALESCE(group_concat(json_quote(e.value), ','), '') \
             || ']' FROM json_each(subjects.enrolled_students) AS e \
           WHERE e.value NOT IN (SELECT value FROM json_each(?)))",
          vec![list.clone()],
        )],
        Some(Fragment::new(
          "EXISTS (SELECT 1 FROM json_each(subjects.enrolled_students) AS g \
           WHERE g.value IN (SELECT value FROM json_each(?)))",
          vec![list],
        )),
      )
    }

    SubjectUpdate::ClearStudents => UpdatePlan::single(
      vec![Fragment::new("enrolled_students = '[]'", vec![])],
      Some(Fragment::new("enrolled_students <> '[]'", vec![])),
    ),
  })
}

fn subject_fields(patch: &SubjectPatch) -> Vec<Fragment> {
  let mut sets = Vec::new();
  if let Some(name) = &patch.name {
    sets.push(Fragment::new("name = ?", vec![text(name.as_str())]));
  }
  if let Some(active) = patch.active {
    sets.push(Fragment::new("active = ?", vec![flag(active)]));
  }
  sets
}
