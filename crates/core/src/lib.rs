//! Core domain types, errors, and constants for zpress.
//!
//! ## Key Components
//!
//! - **`errors`**: the primary `Error` enum and `Result` alias shared by all crates.
//! - **`types`**: compression levels, task records and file references.
//! - **`store`**: the persistence boundary (`TaskStore`) and an in-memory implementation.
//! - **`constants`**: shared static values such as environment variable names.

pub mod constants;
pub mod errors;
pub mod store;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    store::{MemoryTaskStore, TaskStore},
    types::*,
};
