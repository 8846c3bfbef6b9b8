//! Core types and the relationship consistency engine for the Roster
//! student/subject store.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::RosterStore`]; the HTTP layer drives
//! [`roster::Roster`].

pub mod error;
pub mod filter;
pub mod guard;
pub mod relation;
pub mod roster;
pub mod store;
pub mod student;
pub mod subject;

pub use error::{Error, ErrorKind, Result};
pub use roster::Roster;
