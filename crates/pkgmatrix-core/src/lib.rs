//! pkgmatrix core
//!
//! Domain types, traits, and error handling for the build matrix scheduler.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used by the store adapters, the remote clients, and the scheduler.

pub mod build;
pub mod error;
pub mod ids;
pub mod matrix;
pub mod package;
pub mod ports;
pub mod settings;
pub mod version;

pub use error::{Error, Result};
pub use ids::*;
