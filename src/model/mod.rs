//! Data types, split by where they live: [`db`] for what is stored,
//! [`api`] for what goes over the wire, [`common`] for the election rules
//! and types shared by both.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
