//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod problem_repo;
pub mod submission_repo;

pub use problem_repo::ProblemRepo;
pub use submission_repo::SubmissionRepo;
