//! Builds engine sources from configuration.

use std::sync::Arc;

use osfed_search::sources::{FeedFileSource, HttpSource};
use osfed_search::{FederationConfig, ItemComparer, SharedSource};

use crate::config::SourceConfig;
use crate::error::Result;

/// Build every configured source, in declaration order.
///
/// File sources are loaded and sorted with `comparer`; remote sources share
/// one HTTP client, built only when at least one is configured.
///
/// # Errors
///
/// Returns an error if a feed file cannot be read or parsed, or the HTTP
/// client cannot be built.
pub async fn build_sources(
    configs: &[SourceConfig],
    federation: &FederationConfig,
    comparer: &ItemComparer,
) -> Result<Vec<SharedSource>> {
    let mut client = None;
    let mut sources: Vec<SharedSource> = Vec::with_capacity(configs.len());

    for config in configs {
        let source: SharedSource = match config {
            SourceConfig::File {
                name,
                path,
                index_offset,
            } => Arc::new(
                FeedFileSource::open(name.as_str(), path)
                    .await?
                    .with_index_offset(*index_offset)
                    .sorted_by(comparer),
            ),
            SourceConfig::Http {
                name,
                template,
                index_offset,
                total_results,
                help_link,
            } => {
                let shared = match client.take() {
                    Some(shared) => shared,
                    None => osfed_search::http::build_client(federation)?,
                };
                client = Some(shared.clone());
                let mut source = HttpSource::new(name.as_str(), template.as_str(), shared)
                    .with_index_offset(*index_offset);
                if let Some(total) = total_results {
                    source = source.with_declared_total(*total);
                }
                if let Some(link) = help_link {
                    source = source.with_help_link(link.as_str());
                }
                Arc::new(source)
            }
        };
        tracing::debug!(source = config.name(), extent = ?source.extent(), "source ready");
        sources.push(source);
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osfed_search::SourceExtent;

    #[tokio::test]
    async fn builds_file_and_http_sources() {
        let dir = tempfile::tempdir().expect("tempdir");
        let feed = dir.path().join("feed.json");
        std::fs::write(
            &feed,
            r#"{ "items": [ { "id": "f1", "sortKey": "1" }, { "id": "f2", "sortKey": "2" } ] }"#,
        )
        .expect("write feed");

        let configs = vec![
            SourceConfig::File {
                name: "local".into(),
                path: feed,
                index_offset: 1,
            },
            SourceConfig::Http {
                name: "remote".into(),
                template: "https://remote.example/?q={searchTerms}".into(),
                index_offset: 1,
                total_results: None,
                help_link: None,
            },
            SourceConfig::Http {
                name: "sized".into(),
                template: "https://sized.example/?q={searchTerms}".into(),
                index_offset: 0,
                total_results: Some(40),
                help_link: Some("https://sized.example/help".into()),
            },
        ];

        let sources = build_sources(&configs, &FederationConfig::default(), &ItemComparer::default())
            .await
            .expect("sources");

        let names: Vec<&str> = sources.iter().map(|s| s.identity()).collect();
        assert_eq!(names, ["local", "remote", "sized"]);
        assert_eq!(sources[0].extent(), SourceExtent::Bounded(2));
        assert_eq!(sources[1].extent(), SourceExtent::Unbounded);
        assert_eq!(sources[2].extent(), SourceExtent::Bounded(40));
        assert_eq!(sources[2].index_offset(), 0);
        assert_eq!(sources[2].help_link(), Some("https://sized.example/help"));
    }

    #[tokio::test]
    async fn missing_feed_file_is_an_error() {
        let configs = vec![SourceConfig::File {
            name: "gone".into(),
            path: "/nonexistent/feed.json".into(),
            index_offset: 1,
        }];
        let result = build_sources(&configs, &FederationConfig::default(), &ItemComparer::default()).await;
        assert!(result.is_err());
    }
}
