//! Shared domain types for the Punchcard project.

pub mod config;
pub mod frame;
pub mod record;

mod errors;

pub use errors::{PunchcardError, Result};
