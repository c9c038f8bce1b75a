//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Times of day are serialised as `HH:MM:SS` strings.

pub mod admin;
pub mod candidate;
pub mod poll;
pub mod vote;
pub mod voter;
