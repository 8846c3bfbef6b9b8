//! Typed list filters.
//!
//! HTTP query strings arrive as flat optional strings ([`StudentQuery`],
//! [`SubjectQuery`]). They are parsed once into [`StudentFilter`] /
//! [`SubjectFilter`], which enumerate every recognised key and which the store
//! compiles into its native query form. All present conditions are ANDed.

use serde::Deserialize;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Active flag ─────────────────────────────────────────────────────────────

/// Tri-state filter on the soft-delete flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveFilter {
  #[default]
  Active,
  Inactive,
  /// Matches both active and inactive records.
  Any,
}

impl ActiveFilter {
  /// `"true"` or absent selects active records, `"false"` inactive ones, and
  /// any other literal disables the filter.
  pub fn parse(raw: Option<&str>) -> Self {
    match raw {
      None | Some("true") => Self::Active,
      Some("false") => Self::Inactive,
      Some(_) => Self::Any,
    }
  }

  /// The value the `active` flag must have, if constrained.
  pub fn required(self) -> Option<bool> {
    match self {
      Self::Active => Some(true),
      Self::Inactive => Some(false),
      Self::Any => None,
    }
  }
}

// ─── Raw query parameters ────────────────────────────────────────────────────

/// Query parameters accepted when listing students. List-valued keys are
/// comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuery {
  pub active:     Option<String>,
  pub id:         Option<String>,
  pub student_id: Option<String>,
  pub name:       Option<String>,
  pub last_name:  Option<String>,
  pub group:      Option<String>,
  pub subjects:   Option<String>,
  pub grade:      Option<String>,
  pub grade_min:  Option<String>,
  pub grade_max:  Option<String>,
}

/// Query parameters accepted when listing subjects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectQuery {
  pub active:   Option<String>,
  pub id:       Option<String>,
  pub name:     Option<String>,
  pub students: Option<String>,
}

// ─── Typed filters ───────────────────────────────────────────────────────────

/// A predicate over a single enrollment entry. A student matches when at
/// least one of its enrollments satisfies every present condition at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentMatch {
  pub subject_ids: Option<Vec<Uuid>>,
  pub grade:       Option<f64>,
  pub grade_min:   Option<f64>,
  pub grade_max:   Option<f64>,
}

/// For the list-valued fields, `None` means "not filtered" while an empty
/// list matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentFilter {
  pub active:      ActiveFilter,
  pub ids:         Option<Vec<Uuid>>,
  pub student_ids: Option<Vec<u32>>,
  /// Case-insensitive substrings; any may match.
  pub names:       Option<Vec<String>>,
  pub last_names:  Option<Vec<String>>,
  pub groups:      Option<Vec<String>>,
  pub enrollment:  Option<EnrollmentMatch>,
}

impl StudentFilter {
  pub fn parse(query: &StudentQuery) -> Result<Self> {
    let subject_ids = query.subjects.as_deref().map(uuid_list).transpose()?;
    let grade = query.grade.as_deref().map(|g| number("grade", g)).transpose()?;
    let grade_min = query
      .grade_min
      .as_deref()
      .map(|g| number("grade_min", g))
      .transpose()?;
    let grade_max = query
      .grade_max
      .as_deref()
      .map(|g| number("grade_max", g))
      .transpose()?;

    let enrollment = EnrollmentMatch { subject_ids, grade, grade_min, grade_max };
    let enrollment = (enrollment != EnrollmentMatch::default()).then_some(enrollment);

    Ok(Self {
      active: ActiveFilter::parse(query.active.as_deref()),
      ids: query.id.as_deref().map(uuid_list).transpose()?,
      student_ids: query.student_id.as_deref().map(number_list),
      names: query.name.as_deref().map(pattern_list),
      last_names: query.last_name.as_deref().map(pattern_list),
      groups: query.group.as_deref().map(string_list),
      enrollment,
    })
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectFilter {
  pub active:      ActiveFilter,
  pub ids:         Option<Vec<Uuid>>,
  pub names:       Option<Vec<String>>,
  /// Subjects enrolling any of these students.
  pub student_ids: Option<Vec<Uuid>>,
}

impl SubjectFilter {
  pub fn parse(query: &SubjectQuery) -> Result<Self> {
    Ok(Self {
      active:      ActiveFilter::parse(query.active.as_deref()),
      ids:         query.id.as_deref().map(uuid_list).transpose()?,
      names:       query.name.as_deref().map(pattern_list),
      student_ids: query.students.as_deref().map(uuid_list).transpose()?,
    })
  }
}

// ─── List parsing ────────────────────────────────────────────────────────────

/// Split on commas and trim each entry.
pub fn string_list(raw: &str) -> Vec<String> {
  raw.split(',').map(|s| s.trim().to_owned()).collect()
}

/// Like [`string_list`], dropping empty entries: an empty substring would
/// match everything.
fn pattern_list(raw: &str) -> Vec<String> {
  string_list(raw).into_iter().filter(|s| !s.is_empty()).collect()
}

/// Entries that are not non-negative integers are dropped.
pub fn number_list(raw: &str) -> Vec<u32> {
  raw.split(',').filter_map(|s| s.trim().parse().ok()).collect()
}

fn uuid_list(raw: &str) -> Result<Vec<Uuid>> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      Uuid::parse_str(s).map_err(|_| Error::InvalidFilter(format!("malformed id {s:?}")))
    })
    .collect()
}

fn number(key: &str, raw: &str) -> Result<f64> {
  raw
    .trim()
    .parse()
    .map_err(|_| Error::InvalidFilter(format!("{key} must be a number, got {raw:?}")))
}
