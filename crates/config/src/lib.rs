//! Configuration management for zpress
//!
//! Every component is built from one section of [`Config`]. The
//! [`ConfigLoader`] layers defaults, an optional JSON file and `ZPRESS_*`
//! environment variables, in that order of increasing precedence.

pub mod config;
pub mod loader;

pub use config::*;
pub use loader::*;
