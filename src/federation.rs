//! The configured federation: engine, cursor store and sources together.

use std::sync::Arc;

use osfed_search::{
    FederatedSearch, ItemComparer, MergedPage, MokaCursorStore, QueryParameters, SharedSource,
};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::registry::build_sources;

/// Answers merged pages over the configured sources.
///
/// One instance serves every request of a process, so sequential pages of
/// the same query resume from cached cursors.
#[derive(Debug)]
pub struct Federation {
    search: FederatedSearch,
    sources: Vec<SharedSource>,
    comparer: ItemComparer,
}

impl Federation {
    /// Federation over already-built sources.
    pub fn new(search: FederatedSearch, sources: Vec<SharedSource>, comparer: ItemComparer) -> Self {
        Self {
            search,
            sources,
            comparer,
        }
    }

    /// Validate `config`, build its sources and an in-memory cursor store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, lists no sources,
    /// or a source cannot be built.
    pub async fn from_config(config: &AppConfig, comparer: ItemComparer) -> Result<Self> {
        config.validate()?;
        if config.sources.is_empty() {
            return Err(AppError::Config("no sources configured".into()));
        }

        let store = Arc::new(MokaCursorStore::from_config(&config.federation));
        let search = FederatedSearch::new(config.federation.clone(), store)?;
        let sources = build_sources(&config.sources, &config.federation, &comparer).await?;
        tracing::info!(sources = sources.len(), "federation ready");
        Ok(Self::new(search, sources, comparer))
    }

    /// All sources, in configuration order.
    pub fn sources(&self) -> &[SharedSource] {
        &self.sources
    }

    /// Names of all sources.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.identity()).collect()
    }

    /// Active comparer.
    pub fn comparer(&self) -> &ItemComparer {
        &self.comparer
    }

    /// Build one page over all sources, or over the sources named in `only`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownSource`] if `only` names a source that is
    /// not configured, or the engine's configuration errors.
    pub async fn page(&self, params: &QueryParameters, only: &[String]) -> Result<MergedPage> {
        let selected = self.select(only)?;
        let page = self.search.page(&selected, params, Some(&self.comparer)).await?;
        for failure in &page.failures {
            tracing::warn!(source = %failure.source, message = %failure.message, "source failed during request");
        }
        Ok(page)
    }

    fn select(&self, only: &[String]) -> Result<Vec<SharedSource>> {
        if only.is_empty() {
            return Ok(self.sources.clone());
        }
        only.iter()
            .map(|name| {
                self.sources
                    .iter()
                    .find(|s| s.identity() == name)
                    .cloned()
                    .ok_or_else(|| AppError::UnknownSource(name.clone()))
            })
            .collect()
    }
}
