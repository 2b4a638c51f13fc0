//! Shared utilities for zpress
//!
//! Small, mostly side-effect free helpers used across the workspace.

pub mod atomic_file;
pub mod tracing;
pub mod xdg;

pub use atomic_file::*;
pub use xdg::*;
