//! Source implementations.
//!
//! Each module provides a struct implementing [`crate::source::Source`]:
//! in-process item lists, result documents on disk, and remote endpoints
//! addressed through OpenSearch URL templates.

pub mod document;
pub mod feed_file;
pub mod http;
pub mod memory;
pub mod template;

pub use document::ResultDocument;
pub use feed_file::FeedFileSource;
pub use http::HttpSource;
pub use memory::MemorySource;
