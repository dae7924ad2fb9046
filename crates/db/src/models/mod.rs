//! Row structs matching the database schema.
//!
//! Each submodule contains a `FromRow` entity struct plus conversion
//! into the `lemma-core` domain type.

pub mod problem;
pub mod submission;
