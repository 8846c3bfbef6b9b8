//! Integration tests for `Roster` over `SqliteStore` against an in-memory
//! database.

use std::{future::Future, time::Duration};

use chrono::NaiveDate;
use roster_core::{
  Error, ErrorKind, Roster,
  filter::{StudentFilter, StudentQuery, SubjectFilter, SubjectQuery},
  store::{Documents, RosterStore, Selector, StudentUpdate, SubjectUpdate, UpdateCount},
  student::{Enrollment, Grade, NewStudent, Student, StudentPatch},
  subject::{NewSubject, Subject, SubjectPatch},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn roster() -> Roster<SqliteStore> {
  Roster::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

fn new_student(number: u32, name: &str) -> NewStudent {
  NewStudent::new(number, name, "Pérez", NaiveDate::from_ymd_opt(2005, 6, 15).unwrap())
}

fn grade(value: f64) -> Grade { Grade::new(value).unwrap() }

async fn subject(r: &Roster<SqliteStore>, name: &str) -> Subject {
  r.create_subject(NewSubject::new(name)).await.unwrap()
}

async fn student(r: &Roster<SqliteStore>, number: u32) -> Student {
  r.create_student(new_student(number, "Lucía")).await.unwrap()
}

async fn all_students(r: &Roster<SqliteStore>) -> Vec<Student> {
  let query = StudentQuery { active: Some("any".into()), ..StudentQuery::default() };
  r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap()
}

async fn all_subjects(r: &Roster<SqliteStore>) -> Vec<Subject> {
  let query = SubjectQuery { active: Some("any".into()), ..SubjectQuery::default() };
  r.find_subjects(SubjectFilter::parse(&query).unwrap()).await.unwrap()
}

/// Every enrollment is mirrored on the subject and vice versa.
async fn assert_symmetric(r: &Roster<SqliteStore>) {
  let students = all_students(r).await;
  let subjects = all_subjects(r).await;

  for s in &students {
    for e in &s.enrollments {
      let subject = subjects.iter().find(|u| u.id == e.subject_id).expect("dangling subject");
      assert!(subject.has_student(s.id), "{} missing from subject {}", s.id, subject.id);
    }
  }
  for u in &subjects {
    for id in &u.enrolled_students {
      let student = students.iter().find(|s| s.id == *id).expect("dangling student");
      assert!(student.is_enrolled_in(u.id), "{} missing from student {}", u.id, student.id);
    }
  }
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_student() {
  let r = roster().await;
  let mut input = new_student(42, "María José");
  input.group = Some("A-1".into());

  let created = r.create_student(input).await.unwrap();
  assert!(created.active);
  assert!(created.enrollments.is_empty());

  let fetched = r.get_student(created.id).await.unwrap();
  assert_eq!(fetched.student_id, 42);
  assert_eq!(fetched.name, "María José");
  assert_eq!(fetched.group.as_deref(), Some("A-1"));
  assert_eq!(fetched.birth_date, created.birth_date);
}

#[tokio::test]
async fn missing_student_is_not_found() {
  let r = roster().await;
  let id = Uuid::new_v4();
  let err = r.get_student(id).await.unwrap_err();
  assert!(matches!(err, Error::StudentNotFound(missing) if missing == id));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn create_student_with_enrollments_registers_on_subjects() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let art = subject(&r, "Art").await;

  let mut input = new_student(1, "Ana");
  input.enrollments = vec![
    Enrollment::new(math.id, Some(grade(88.0))),
    Enrollment::ungraded(art.id),
  ];
  let created = r.create_student(input).await.unwrap();

  assert!(r.get_subject(math.id).await.unwrap().has_student(created.id));
  assert!(r.get_subject(art.id).await.unwrap().has_student(created.id));

  let fetched = r.get_student(created.id).await.unwrap();
  assert_eq!(fetched.enrollment(math.id).unwrap().grade, Some(grade(88.0)));
  assert_eq!(fetched.enrollment(art.id).unwrap().grade, None);
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn create_student_with_unknown_subject_persists_nothing() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let ghost = Uuid::new_v4();

  let mut input = new_student(1, "Ana");
  input.enrollments = vec![Enrollment::ungraded(math.id), Enrollment::ungraded(ghost)];
  let err = r.create_student(input).await.unwrap_err();

  assert!(matches!(&err, Error::MissingIds { ids, .. } if ids == &vec![ghost]));
  assert!(all_students(&r).await.is_empty());
  assert!(r.get_subject(math.id).await.unwrap().enrolled_students.is_empty());
}

#[tokio::test]
async fn create_student_with_duplicate_subject_is_rejected() {
  let r = roster().await;
  let math = subject(&r, "Math").await;

  let mut input = new_student(1, "Ana");
  input.enrollments = vec![Enrollment::ungraded(math.id), Enrollment::ungraded(math.id)];
  let err = r.create_student(input).await.unwrap_err();

  assert!(matches!(err, Error::DuplicateReference { id, .. } if id == math.id));
  assert!(all_students(&r).await.is_empty());
}

#[tokio::test]
async fn create_many_students_is_all_or_nothing() {
  let r = roster().await;
  let math = subject(&r, "Math").await;

  let mut good = new_student(1, "Ana");
  good.enrollments = vec![Enrollment::ungraded(math.id)];
  let mut bad = new_student(2, "Luis");
  bad.enrollments = vec![Enrollment::ungraded(Uuid::new_v4())];

  assert!(r.create_students(vec![good.clone(), bad]).await.is_err());
  assert!(all_students(&r).await.is_empty());
  assert!(r.get_subject(math.id).await.unwrap().enrolled_students.is_empty());

  let created = r.create_students(vec![good, new_student(3, "Eva")]).await.unwrap();
  assert_eq!(created.len(), 2);
  assert_eq!(r.get_subject(math.id).await.unwrap().enrolled_students, vec![created[0].id]);
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn create_subject_with_students_enrolls_them_ungraded() {
  let r = roster().await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;

  let mut input = NewSubject::new("History");
  input.enrolled_students = vec![a.id, b.id];
  let history = r.create_subject(input).await.unwrap();

  for id in [a.id, b.id] {
    let s = r.get_student(id).await.unwrap();
    assert_eq!(s.enrollments, vec![Enrollment::ungraded(history.id)]);
  }
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn create_subjects_rejects_missing_students() {
  let r = roster().await;
  let a = student(&r, 1).await;
  let ghost = Uuid::new_v4();

  let mut first = NewSubject::new("History");
  first.enrolled_students = vec![a.id];
  let mut second = NewSubject::new("Music");
  second.enrolled_students = vec![ghost, a.id];

  let err = r.create_subjects(vec![first, second]).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(all_subjects(&r).await.is_empty());
  assert!(r.get_student(a.id).await.unwrap().enrollments.is_empty());
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_student_touches_only_given_fields() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let s = student(&r, 7).await;
  r.enroll(s.id, math.id, Some(grade(70.0))).await.unwrap();

  let patch = StudentPatch { group: Some("B-2".into()), ..StudentPatch::default() };
  let updated = r.update_student(s.id, patch).await.unwrap();

  assert_eq!(updated.group.as_deref(), Some("B-2"));
  assert_eq!(updated.name, s.name);
  assert_eq!(updated.student_id, 7);
  assert_eq!(updated.enrollments.len(), 1);
  assert!(updated.updated_at >= s.updated_at);
}

#[tokio::test]
async fn update_missing_student_is_not_found() {
  let r = roster().await;
  let patch = StudentPatch { name: Some("Eva".into()), ..StudentPatch::default() };
  let err = r.update_student(Uuid::new_v4(), patch).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn update_subject_renames() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let patch = SubjectPatch { name: Some("Algebra".into()), ..SubjectPatch::default() };
  assert_eq!(r.update_subject(math.id, patch).await.unwrap().name, "Algebra");
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn enroll_updates_both_sides() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let s = student(&r, 1).await;

  let updated = r.enroll(s.id, math.id, Some(grade(95.0))).await.unwrap();
  assert_eq!(updated.enrollments, vec![Enrollment::new(math.id, Some(grade(95.0)))]);
  assert_eq!(r.get_subject(math.id).await.unwrap().enrolled_students, vec![s.id]);
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn enrolling_twice_conflicts_without_growing_lists() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let s = student(&r, 1).await;
  r.enroll(s.id, math.id, None).await.unwrap();

  let err = r.enroll(s.id, math.id, None).await.unwrap_err();
  assert!(matches!(err, Error::RelationExists { .. }));
  assert_eq!(err.kind(), ErrorKind::RelationState);

  assert_eq!(r.get_student(s.id).await.unwrap().enrollments.len(), 1);
  assert_eq!(r.get_subject(math.id).await.unwrap().enrolled_students.len(), 1);
}

#[tokio::test]
async fn enroll_in_missing_subject_is_not_found() {
  let r = roster().await;
  let s = student(&r, 1).await;
  let err = r.enroll(s.id, Uuid::new_v4(), None).await.unwrap_err();
  assert!(matches!(err, Error::SubjectNotFound(_)));
  assert!(r.get_student(s.id).await.unwrap().enrollments.is_empty());
}

#[tokio::test]
async fn update_grade_changes_only_that_entry() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let art = subject(&r, "Art").await;
  let s = student(&r, 1).await;
  r.enroll(s.id, math.id, Some(grade(60.0))).await.unwrap();
  r.enroll(s.id, art.id, Some(grade(80.0))).await.unwrap();

  let updated = r.update_grade(s.id, math.id, grade(75.5)).await.unwrap();
  assert_eq!(updated.enrollments, vec![
    Enrollment::new(math.id, Some(grade(75.5))),
    Enrollment::new(art.id, Some(grade(80.0))),
  ]);
}

#[tokio::test]
async fn update_grade_without_enrollment_conflicts() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let s = student(&r, 1).await;
  let err = r.update_grade(s.id, math.id, grade(50.0)).await.unwrap_err();
  assert!(matches!(err, Error::RelationMissing { .. }));
}

#[tokio::test]
async fn unenroll_removes_both_sides() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let art = subject(&r, "Art").await;
  let s = student(&r, 1).await;
  r.enroll(s.id, math.id, Some(grade(90.0))).await.unwrap();
  r.enroll(s.id, art.id, None).await.unwrap();

  let updated = r.unenroll(s.id, math.id).await.unwrap();
  assert_eq!(updated.enrollments, vec![Enrollment::ungraded(art.id)]);
  assert!(r.get_subject(math.id).await.unwrap().enrolled_students.is_empty());
  assert_eq!(r.get_subject(art.id).await.unwrap().enrolled_students, vec![s.id]);

  let err = r.unenroll(s.id, math.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::RelationState);
  assert_symmetric(&r).await;
}

// ─── Batch add / remove ──────────────────────────────────────────────────────

#[tokio::test]
async fn add_students_enrolls_the_whole_batch() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;

  let updated = r.add_students(math.id, vec![a.id, b.id]).await.unwrap();
  assert_eq!(updated.enrolled_students, vec![a.id, b.id]);
  assert!(r.get_student(a.id).await.unwrap().is_enrolled_in(math.id));
  assert!(r.get_student(b.id).await.unwrap().is_enrolled_in(math.id));
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn add_students_with_one_unknown_id_changes_nothing() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;
  let ghost = Uuid::new_v4();

  let err = r.add_students(math.id, vec![a.id, ghost, b.id]).await.unwrap_err();
  assert!(matches!(&err, Error::MissingIds { ids, .. } if ids == &vec![ghost]));

  assert!(r.get_subject(math.id).await.unwrap().enrolled_students.is_empty());
  assert!(r.get_student(a.id).await.unwrap().enrollments.is_empty());
  assert!(r.get_student(b.id).await.unwrap().enrollments.is_empty());
}

#[tokio::test]
async fn add_students_with_one_already_enrolled_changes_nothing() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;
  r.enroll(a.id, math.id, None).await.unwrap();

  let err = r.add_students(math.id, vec![b.id, a.id]).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::RelationState);
  assert_eq!(r.get_subject(math.id).await.unwrap().enrolled_students, vec![a.id]);
  assert!(r.get_student(b.id).await.unwrap().enrollments.is_empty());
}

#[tokio::test]
async fn empty_batch_is_rejected() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let err = r.add_students(math.id, vec![]).await.unwrap_err();
  assert!(matches!(err, Error::EmptyBatch(_)));
}

#[tokio::test]
async fn remove_students_unenrolls_the_batch() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;
  let c = student(&r, 3).await;
  r.add_students(math.id, vec![a.id, b.id, c.id]).await.unwrap();

  let updated = r.remove_students(math.id, vec![a.id, c.id]).await.unwrap();
  assert_eq!(updated.enrolled_students, vec![b.id]);
  assert!(!r.get_student(a.id).await.unwrap().is_enrolled_in(math.id));
  assert!(r.get_student(b.id).await.unwrap().is_enrolled_in(math.id));
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn remove_students_not_enrolled_changes_nothing() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;
  r.enroll(a.id, math.id, None).await.unwrap();

  let err = r.remove_students(math.id, vec![a.id, b.id]).await.unwrap_err();
  assert!(matches!(err, Error::RelationMissing { counterpart_id, .. } if counterpart_id == b.id));
  assert_eq!(r.get_subject(math.id).await.unwrap().enrolled_students, vec![a.id]);
  assert!(r.get_student(a.id).await.unwrap().is_enrolled_in(math.id));
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn soft_delete_student_drops_every_enrollment() {
  let r = roster().await;
  let s = student(&r, 1).await;
  let mut subjects = Vec::new();
  for name in ["Math", "Art", "History"] {
    let u = subject(&r, name).await;
    r.enroll(s.id, u.id, Some(grade(70.0))).await.unwrap();
    subjects.push(u);
  }

  let deleted = r.soft_delete_student(s.id).await.unwrap();
  assert!(!deleted.active);
  assert!(deleted.enrollments.is_empty());
  for u in subjects {
    assert!(!r.get_subject(u.id).await.unwrap().has_student(s.id));
  }
  assert_eq!(r.get_student(s.id).await.unwrap().id, s.id);
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn hard_delete_subject_keeps_other_grades() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let art = subject(&r, "Art").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;
  for s in [&a, &b] {
    r.enroll(s.id, math.id, Some(grade(55.0))).await.unwrap();
    r.enroll(s.id, art.id, Some(grade(99.0))).await.unwrap();
  }

  let deleted = r.hard_delete_subject(math.id).await.unwrap();
  assert_eq!(deleted.id, math.id);
  assert!(matches!(r.get_subject(math.id).await, Err(Error::SubjectNotFound(_))));

  for s in [&a, &b] {
    let s = r.get_student(s.id).await.unwrap();
    assert_eq!(s.enrollments, vec![Enrollment::new(art.id, Some(grade(99.0)))]);
  }
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn hard_delete_student_purges_subjects() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;
  r.add_students(math.id, vec![a.id, b.id]).await.unwrap();

  r.hard_delete_student(a.id).await.unwrap();
  assert_eq!(r.get_subject(math.id).await.unwrap().enrolled_students, vec![b.id]);

  let err = r.hard_delete_student(a.id).await.unwrap_err();
  assert!(matches!(err, Error::StudentNotFound(id) if id == a.id));
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn soft_delete_subject_drops_its_students() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let art = subject(&r, "Art").await;
  let a = student(&r, 1).await;
  r.enroll(a.id, math.id, None).await.unwrap();
  r.enroll(a.id, art.id, Some(grade(12.0))).await.unwrap();

  let deleted = r.soft_delete_subject(math.id).await.unwrap();
  assert!(!deleted.active);
  assert!(deleted.enrolled_students.is_empty());
  assert_eq!(
    r.get_student(a.id).await.unwrap().enrollments,
    vec![Enrollment::new(art.id, Some(grade(12.0)))]
  );
  assert_symmetric(&r).await;
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn group_filter_returns_active_matches_in_student_id_order() {
  let r = roster().await;
  for (number, group) in [(30, "A-1"), (10, "A-1"), (20, "B-2"), (5, "A-1")] {
    let mut input = new_student(number, "Ana");
    input.group = Some(group.into());
    let s = r.create_student(input).await.unwrap();
    if number == 5 {
      r.soft_delete_student(s.id).await.unwrap();
    }
  }

  let query = StudentQuery { group: Some("A-1,C-3".into()), ..StudentQuery::default() };
  let found = r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap();

  let numbers: Vec<u32> = found.iter().map(|s| s.student_id).collect();
  assert_eq!(numbers, vec![10, 30]);
  assert!(found.iter().all(|s| s.active && s.group.as_deref() == Some("A-1")));
}

#[tokio::test]
async fn active_filter_is_tri_state() {
  let r = roster().await;
  let a = student(&r, 1).await;
  student(&r, 2).await;
  r.soft_delete_student(a.id).await.unwrap();

  let count = |active: Option<&str>| {
    let query = StudentQuery { active: active.map(str::to_owned), ..StudentQuery::default() };
    StudentFilter::parse(&query).unwrap()
  };
  assert_eq!(r.find_students(count(None)).await.unwrap().len(), 1);
  assert_eq!(r.find_students(count(Some("false"))).await.unwrap().len(), 1);
  assert_eq!(r.find_students(count(Some("both"))).await.unwrap().len(), 2);
}

#[tokio::test]
async fn name_filter_is_case_insensitive_substring() {
  let r = roster().await;
  r.create_student(new_student(1, "Roberto")).await.unwrap();
  r.create_student(new_student(2, "Alberto")).await.unwrap();
  r.create_student(new_student(3, "Ana")).await.unwrap();

  let query = StudentQuery { name: Some("BERT".into()), ..StudentQuery::default() };
  let found = r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap();
  assert_eq!(found.len(), 2);

  let query = StudentQuery { name: Some("50%".into()), ..StudentQuery::default() };
  assert!(r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap().is_empty());
}

#[tokio::test]
async fn enrollment_filters_match_within_one_entry() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  let art = subject(&r, "Art").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;
  // a: math 90, art 40. b: math 40, art 90.
  r.enroll(a.id, math.id, Some(grade(90.0))).await.unwrap();
  r.enroll(a.id, art.id, Some(grade(40.0))).await.unwrap();
  r.enroll(b.id, math.id, Some(grade(40.0))).await.unwrap();
  r.enroll(b.id, art.id, Some(grade(90.0))).await.unwrap();

  let query = StudentQuery {
    subjects: Some(math.id.to_string()),
    grade_min: Some("80".into()),
    ..StudentQuery::default()
  };
  let found = r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap();
  assert_eq!(found.iter().map(|s| s.id).collect::<Vec<_>>(), vec![a.id]);

  let query = StudentQuery { grade: Some("40".into()), ..StudentQuery::default() };
  assert_eq!(r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn student_id_filter_ignores_non_numbers() {
  let r = roster().await;
  student(&r, 1).await;
  student(&r, 2).await;
  student(&r, 3).await;

  let query = StudentQuery { student_id: Some("3, x, 1".into()), ..StudentQuery::default() };
  let found = r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap();
  assert_eq!(found.iter().map(|s| s.student_id).collect::<Vec<_>>(), vec![1, 3]);

  let query = StudentQuery { student_id: Some("x".into()), ..StudentQuery::default() };
  assert!(r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap().is_empty());
}

#[tokio::test]
async fn subjects_filter_by_enrolled_student() {
  let r = roster().await;
  let math = subject(&r, "Math").await;
  subject(&r, "Art").await;
  let a = student(&r, 1).await;
  r.enroll(a.id, math.id, None).await.unwrap();

  let query = SubjectQuery { students: Some(a.id.to_string()), ..SubjectQuery::default() };
  let found = r.find_subjects(SubjectFilter::parse(&query).unwrap()).await.unwrap();
  assert_eq!(found.iter().map(|u| u.id).collect::<Vec<_>>(), vec![math.id]);

  let query = SubjectQuery { name: Some("ar".into()), ..SubjectQuery::default() };
  let found = r.find_subjects(SubjectFilter::parse(&query).unwrap()).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].name, "Art");
}

#[tokio::test]
async fn name_filters_fold_accented_letters() {
  let r = roster().await;
  r.create_student(NewStudent::new(
    1,
    "Ángel",
    "Pérez",
    NaiveDate::from_ymd_opt(2004, 1, 9).unwrap(),
  ))
  .await
  .unwrap();
  r.create_student(new_student(2, "Ana")).await.unwrap();

  let query = StudentQuery { name: Some("ángel".into()), ..StudentQuery::default() };
  let found = r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap();
  assert_eq!(found.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["Ángel"]);

  let query = StudentQuery { last_name: Some("PÉREZ".into()), ..StudentQuery::default() };
  assert_eq!(r.find_students(StudentFilter::parse(&query).unwrap()).await.unwrap().len(), 2);

  r.create_subject(NewSubject::new("Física")).await.unwrap();
  let query = SubjectQuery { name: Some("FÍS".into()), ..SubjectQuery::default() };
  assert_eq!(r.find_subjects(SubjectFilter::parse(&query).unwrap()).await.unwrap().len(), 1);
}

// ─── Failures after the first write ──────────────────────────────────────────

/// A store whose subject-side writes always fail, so any orchestrator that
/// writes the student side first is aborted half way.
struct BrokenSubjectWrites(SqliteStore);

struct BrokenDocuments<'a> {
  inner: &'a dyn Documents,
}

fn subject_write_failure() -> Error {
  Error::store(std::io::Error::other("subject collection is read-only"))
}

impl Documents for BrokenDocuments<'_> {
  fn find_students(&self, filter: &StudentFilter) -> roster_core::Result<Vec<Student>> {
    self.inner.find_students(filter)
  }

  fn student(&self, id: Uuid) -> roster_core::Result<Option<Student>> { self.inner.student(id) }

  fn students(&self, ids: &[Uuid]) -> roster_core::Result<Vec<Student>> {
    self.inner.students(ids)
  }

  fn insert_students(&self, students: &[Student]) -> roster_core::Result<()> {
    self.inner.insert_students(students)
  }

  fn update_student(
    &self,
    id: Uuid,
    update: &StudentUpdate,
  ) -> roster_core::Result<Option<Student>> {
    self.inner.update_student(id, update)
  }

  fn update_students(
    &self,
    selector: &Selector,
    update: &StudentUpdate,
  ) -> roster_core::Result<UpdateCount> {
    self.inner.update_students(selector, update)
  }

  fn delete_student(&self, id: Uuid) -> roster_core::Result<Option<Student>> {
    self.inner.delete_student(id)
  }

  fn find_subjects(&self, filter: &SubjectFilter) -> roster_core::Result<Vec<Subject>> {
    self.inner.find_subjects(filter)
  }

  fn subject(&self, id: Uuid) -> roster_core::Result<Option<Subject>> { self.inner.subject(id) }

  fn subjects(&self, ids: &[Uuid]) -> roster_core::Result<Vec<Subject>> {
    self.inner.subjects(ids)
  }

  fn insert_subjects(&self, _: &[Subject]) -> roster_core::Result<()> {
    Err(subject_write_failure())
  }

  fn update_subject(&self, _: Uuid, _: &SubjectUpdate) -> roster_core::Result<Option<Subject>> {
    Err(subject_write_failure())
  }

  fn update_subjects(&self, _: &Selector, _: &SubjectUpdate) -> roster_core::Result<UpdateCount> {
    Err(subject_write_failure())
  }

  fn delete_subject(&self, _: Uuid) -> roster_core::Result<Option<Subject>> {
    Err(subject_write_failure())
  }
}

impl RosterStore for BrokenSubjectWrites {
  fn transaction<T, F>(&self, work: F) -> impl Future<Output = roster_core::Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> roster_core::Result<T> + Send + 'static,
  {
    self.0.transaction(move |docs| work(&BrokenDocuments { inner: docs }))
  }

  fn read<T, F>(&self, work: F) -> impl Future<Output = roster_core::Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn Documents) -> roster_core::Result<T> + Send + 'static,
  {
    self.0.read(work)
  }
}

fn assert_store_failure(err: &Error) {
  assert_eq!(err.kind(), ErrorKind::TransactionFailed);
  match err {
    Error::TransactionFailed(cause) => assert!(matches!(**cause, Error::Store(_)), "{cause:?}"),
    other => panic!("expected TransactionFailed, got {other:?}"),
  }
}

#[tokio::test]
async fn enroll_rolls_back_student_side_when_subject_write_fails() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let r = Roster::new(store.clone());
  let broken = Roster::new(BrokenSubjectWrites(store));
  let math = subject(&r, "Math").await;
  let s = student(&r, 1).await;

  let err = broken.enroll(s.id, math.id, Some(grade(80.0))).await.unwrap_err();
  assert_store_failure(&err);

  assert!(r.get_student(s.id).await.unwrap().enrollments.is_empty());
  assert!(r.get_subject(math.id).await.unwrap().enrolled_students.is_empty());
  assert_symmetric(&r).await;
}

#[tokio::test]
async fn add_students_rolls_back_every_push_when_subject_write_fails() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let r = Roster::new(store.clone());
  let broken = Roster::new(BrokenSubjectWrites(store));
  let math = subject(&r, "Math").await;
  let a = student(&r, 1).await;
  let b = student(&r, 2).await;

  let err = broken.add_students(math.id, vec![a.id, b.id]).await.unwrap_err();
  assert_store_failure(&err);

  for id in [a.id, b.id] {
    assert!(r.get_student(id).await.unwrap().enrollments.is_empty());
  }
  assert!(r.get_subject(math.id).await.unwrap().enrolled_students.is_empty());
}

#[tokio::test]
async fn create_student_with_enrollments_is_not_persisted_when_subject_write_fails() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let r = Roster::new(store.clone());
  let broken = Roster::new(BrokenSubjectWrites(store));
  let math = subject(&r, "Math").await;

  let mut input = new_student(1, "Ana");
  input.enrollments = vec![Enrollment::ungraded(math.id)];
  assert_store_failure(&broken.create_student(input).await.unwrap_err());

  assert!(all_students(&r).await.is_empty());
}

// ─── Reads and the write lock ────────────────────────────────────────────────

#[tokio::test]
async fn reads_proceed_while_another_connection_holds_the_write_lock() {
  let path = std::env::temp_dir().join(format!("roster-{}.db", Uuid::new_v4()));
  let r = Roster::new(SqliteStore::open(&path).await.unwrap());
  let s = student(&r, 1).await;

  let writer = rusqlite::Connection::open(&path).unwrap();
  writer.execute_batch("BEGIN IMMEDIATE").unwrap();

  let fetched = tokio::time::timeout(Duration::from_secs(1), r.get_student(s.id))
    .await
    .expect("read waited for the write lock")
    .unwrap();
  assert_eq!(fetched.id, s.id);
  let listed = tokio::time::timeout(Duration::from_secs(1), all_students(&r))
    .await
    .expect("read waited for the write lock");
  assert_eq!(listed.len(), 1);

  writer.execute_batch("ROLLBACK").unwrap();
  drop(writer);
  drop(r);
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
  }
}
