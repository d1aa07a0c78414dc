//! osfed: federated OpenSearch querying.
//!
//! This crate is the host side of [`osfed_search`]: it reads a TOML
//! configuration describing the sources, initialises logging, builds the
//! sources and exposes them through a [`Federation`] that answers one merged
//! page per request.

pub mod config;
pub mod error;
pub mod federation;
pub mod logging;
pub mod registry;

pub use config::{AppConfig, LoggingConfig, SourceConfig};
pub use error::{AppError, Result};
pub use federation::Federation;
