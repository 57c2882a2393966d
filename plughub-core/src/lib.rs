//! PlugHub library exports
//!
//! Plugin catalog, release resolution and install reconciliation for a CAD
//! host's plugin manager.

pub mod catalog;
pub mod config;
pub mod error;
pub mod version;

pub use error::{HubError, Operation, Result};
