//! Request body checks applied before anything reaches the core.

use roster_core::student::Grade;

use crate::error::ApiError;

fn bad(field: &str, rule: &str) -> ApiError {
  ApiError::BadRequest(format!("\"{field}\" {rule}"))
}

/// Letter-only words separated by single spaces. Accented letters count.
pub fn person_name(field: &str, value: &str) -> Result<(), ApiError> {
  let ok = !value.is_empty()
    && value
      .split(' ')
      .all(|word| !word.is_empty() && word.chars().all(char::is_alphabetic));
  if ok { Ok(()) } else { Err(bad(field, "must be letters in words separated by single spaces")) }
}

/// Alphanumeric segments joined by single dashes, as in `A-1`.
pub fn group(value: &str) -> Result<(), ApiError> {
  let ok = !value.is_empty()
    && value
      .split('-')
      .all(|part| !part.is_empty() && part.chars().all(char::is_alphanumeric));
  if ok { Ok(()) } else { Err(bad("group", "must be alphanumeric segments joined by '-'")) }
}

pub fn student_number(value: i64) -> Result<u32, ApiError> {
  match u32::try_from(value) {
    Ok(n) if n > 0 => Ok(n),
    _ => Err(bad("student_id", "must be a positive integer")),
  }
}

pub fn grade(value: f64) -> Result<Grade, ApiError> {
  Grade::new(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub fn non_empty<T>(field: &str, items: &[T]) -> Result<(), ApiError> {
  if items.is_empty() { Err(bad(field, "must contain at least one item")) } else { Ok(()) }
}
