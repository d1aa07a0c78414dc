//! Local source backed by a result document on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SearchError;
use crate::orchestrator::compare::ItemComparer;
use crate::source::{Source, SourceRequest};
use crate::types::{ResultBatch, SourceExtent};

use super::document::ResultDocument;
use super::memory::MemorySource;

/// A [`ResultDocument`] loaded once from a file and served from memory.
#[derive(Debug)]
pub struct FeedFileSource {
    path: PathBuf,
    inner: MemorySource,
}

impl FeedFileSource {
    /// Load the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Io`] if the file cannot be read and
    /// [`SearchError::Parse`] if it is not a result document.
    pub async fn open(identity: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref().to_path_buf();
        let bytes = tokio::fs::read(&path).await?;
        let doc = ResultDocument::parse(&bytes)?;
        let inner = MemorySource::new(identity, doc.items);
        tracing::debug!(source = inner.identity(), path = %path.display(), items = inner.len(), "loaded feed file");
        Ok(Self { path, inner })
    }

    /// Builder: first index of the source.
    pub fn with_index_offset(mut self, index_offset: u64) -> Self {
        self.inner = self.inner.with_index_offset(index_offset);
        self
    }

    /// Builder: sort the loaded items with `comparer`.
    pub fn sorted_by(mut self, comparer: &ItemComparer) -> Self {
        self.inner = self.inner.sorted_by(comparer);
        self
    }

    /// File the items were loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Source for FeedFileSource {
    fn identity(&self) -> &str {
        self.inner.identity()
    }

    fn extent(&self) -> SourceExtent {
        self.inner.extent()
    }

    fn index_offset(&self) -> u64 {
        self.inner.index_offset()
    }

    async fn query(&self, request: &SourceRequest) -> Result<ResultBatch, SearchError> {
        self.inner.query(request).await
    }
}
