//! Remote source addressed by an OpenSearch URL template.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::source::{Source, SourceRequest};
use crate::types::{ResultBatch, SourceExtent};

use super::document::ResultDocument;
use super::template;

/// A remote endpoint answering [`ResultDocument`]s over HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpSource {
    identity: String,
    template: String,
    index_offset: u64,
    declared_total: Option<u64>,
    help_link: Option<String>,
    client: reqwest::Client,
}

impl HttpSource {
    /// Source expanding `template` for every query, with no declared total.
    pub fn new(identity: impl Into<String>, template: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            identity: identity.into(),
            template: template.into(),
            index_offset: 1,
            declared_total: None,
            help_link: None,
            client,
        }
    }

    /// Builder: first index of the endpoint.
    pub fn with_index_offset(mut self, index_offset: u64) -> Self {
        self.index_offset = index_offset;
        self
    }

    /// Builder: declared total, making the source bounded.
    pub fn with_declared_total(mut self, total: u64) -> Self {
        self.declared_total = Some(total);
        self
    }

    /// Builder: help link attached to failures.
    pub fn with_help_link(mut self, link: impl Into<String>) -> Self {
        self.help_link = Some(link.into());
        self
    }

    /// URL template.
    pub fn template(&self) -> &str {
        &self.template
    }
}

#[async_trait]
impl Source for HttpSource {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn extent(&self) -> SourceExtent {
        self.declared_total
            .map_or(SourceExtent::Unbounded, SourceExtent::Bounded)
    }

    fn index_offset(&self) -> u64 {
        self.index_offset
    }

    fn help_link(&self) -> Option<&str> {
        self.help_link.as_deref()
    }

    async fn query(&self, request: &SourceRequest) -> Result<ResultBatch, SearchError> {
        let url = template::expand(&self.template, &request.params)?;
        tracing::trace!(source = %self.identity, %url, "querying remote source");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("{}: {e}", self.identity)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Upstream {
                message: format!("{} answered HTTP {status}", self.identity),
                help_link: self.help_link.clone(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_owned();
        let body = response
            .bytes()
            .await
            .map_err(|e| SearchError::Http(format!("{}: {e}", self.identity)))?;

        Ok(ResultDocument::parse(&body)?.into_batch(content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FederationConfig;
    use crate::http::build_client;
    use crate::params::{QueryParameters, SEARCH_TERMS};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> reqwest::Client {
        build_client(&FederationConfig::default()).expect("client")
    }

    #[tokio::test]
    async fn fetches_and_parses_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "ice"))
            .and(query_param("start", "3"))
            .and(query_param("n", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalResults": 40,
                "items": [ { "id": "r3" }, { "id": "r4" } ]
            })))
            .mount(&server)
            .await;

        let template = format!(
            "{}/search?q={{searchTerms}}&start={{startIndex?}}&n={{count?}}",
            server.uri()
        );
        let source = HttpSource::new("remote", template, client());
        let params = QueryParameters::new().with(SEARCH_TERMS, "ice");
        let batch = source
            .query(&SourceRequest::new(&params, 3, 2))
            .await
            .expect("query");

        assert_eq!(batch.total_results, Some(40));
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0].id, "r3");
        assert!(batch.content_type.starts_with("application/json"));
    }

    #[tokio::test]
    async fn error_status_becomes_upstream_error_with_help_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpSource::new("remote", format!("{}/s", server.uri()), client())
            .with_help_link("https://cat.example/status");
        let err = source
            .query(&SourceRequest::new(&QueryParameters::new(), 1, 5))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("503"));
        assert_eq!(err.help_link(), Some("https://cat.example/status"));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html/>"))
            .mount(&server)
            .await;

        let source = HttpSource::new("remote", format!("{}/s", server.uri()), client());
        let err = source
            .query(&SourceRequest::new(&QueryParameters::new(), 1, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn extent_follows_declared_total() {
        let source = HttpSource::new("remote", "https://cat.example/", client());
        assert_eq!(source.extent(), SourceExtent::Unbounded);
        assert_eq!(source.with_declared_total(9).extent(), SourceExtent::Bounded(9));
    }
}
