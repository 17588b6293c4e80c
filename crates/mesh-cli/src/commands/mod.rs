//! Subcommand implementations.
//!
//! Each `run` returns `Ok(true)` when nothing was flagged and `Ok(false)`
//! when the command found a problem, which maps to exit status 1.

pub mod check;
pub mod fit;
pub mod info;
pub mod orient;
