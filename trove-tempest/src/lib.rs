//! Conformance scenarios for the database service, run against a live
//! deployment (or the in-memory fake) through `trove-client`.

pub mod fixtures;
pub mod harness;
pub mod scenarios;

pub use harness::{run, Attr, Outcome, Report, Selection, Suite};
pub use scenarios::all_suites;
