//! Request handlers.

pub mod submissions;
