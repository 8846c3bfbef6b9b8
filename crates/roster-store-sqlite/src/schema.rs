//! SQL schema for the Roster SQLite store.
//!
//! Each collection is one table. Relation lists are embedded as JSON arrays
//! and there are no foreign keys. `roster-core` keeps the two lists
//! consistent.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS students (
    id             TEXT PRIMARY KEY,
    student_id     INTEGER NOT NULL,  -- institution number, not unique
    name           TEXT NOT NULL,
    last_name      TEXT NOT NULL,
    birth_date     TEXT NOT NULL,     -- YYYY-MM-DD
    student_group  TEXT,              -- NULL when unassigned
    enrollments    TEXT NOT NULL DEFAULT '[]',  -- [{\"subject_id\":..,\"grade\":..}]
    active         INTEGER NOT NULL DEFAULT 1,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    id                 TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    enrolled_students  TEXT NOT NULL DEFAULT '[]',  -- [\"<student uuid>\", ..]
    active             INTEGER NOT NULL DEFAULT 1,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS students_number_idx ON students(student_id);
CREATE INDEX IF NOT EXISTS students_active_idx ON students(active);
CREATE INDEX IF NOT EXISTS subjects_active_idx ON subjects(active);

PRAGMA user_version = 1;
";
