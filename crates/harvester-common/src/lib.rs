//! Catalog Harvester Common Library
//!
//! Shared error type and logging setup for the harvester workspace members.
//!
//! # Example
//!
//! ```no_run
//! use harvester_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
