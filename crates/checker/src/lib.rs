//! Proof-checker service integration.
//!
//! [`client::CheckerClient`] submits formal scripts to the external
//! checker; [`diagnostics`] turns the raw diagnostics into a structured
//! [`lemma_core::verdict::VerificationReport`].

pub mod client;
pub mod diagnostics;

pub use client::{CheckerClient, CheckerError, CheckerResponse};
pub use diagnostics::parse_report;
