//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as timestamps.
//! - Times of day are serialised as `HH:MM:SS` strings.

pub mod admin;
pub mod auth;
pub mod candidate;
pub mod id;
pub mod import;
pub mod notify;
pub mod pagination;
pub mod poll;
pub mod results;
pub mod vote;
pub mod voter;
