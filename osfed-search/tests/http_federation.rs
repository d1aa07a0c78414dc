//! Federation over remote sources served by mock HTTP endpoints.
//!
//! Each mock endpoint slices a fixed catalogue by the `start` and `n`
//! query parameters the URL template expands to, the way a real
//! OpenSearch endpoint pages its results.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use osfed_search::http::build_client;
use osfed_search::params::{COUNT, SEARCH_TERMS, START_PAGE};
use osfed_search::sources::HttpSource;
use osfed_search::{FederatedSearch, FederationConfig, QueryParameters, SharedSource};

/// Respond with items `{prefix}{start}..` of a catalogue of `size` items.
fn catalogue(prefix: &'static str, size: u64, key_step: u64, key_start: u64) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |request: &Request| {
        let param = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse::<u64>().ok())
        };
        let start = param("start").unwrap_or(1).max(1);
        let n = param("n").unwrap_or(10);
        let items: Vec<_> = (start..start + n)
            .filter(|i| *i <= size)
            .map(|i| {
                json!({
                    "id": format!("{prefix}{i}"),
                    "title": format!("{prefix} record {i}"),
                    "sortKey": format!("{:06}", key_start - i * key_step),
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "totalResults": size, "items": items }))
    }
}

async fn endpoint(prefix: &'static str, size: u64, key_step: u64, key_start: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opensearch"))
        .respond_with(catalogue(prefix, size, key_step, key_start))
        .mount(&server)
        .await;
    server
}

fn template(server: &MockServer) -> String {
    format!(
        "{}/opensearch?q={{searchTerms}}&start={{startIndex?}}&n={{count?}}",
        server.uri()
    )
}

#[tokio::test]
async fn merges_two_remote_catalogues() {
    let config = FederationConfig::default();
    let client = build_client(&config).expect("client");

    // Keys interleave: even keys from "x", odd keys from "y".
    let x = endpoint("x", 8, 2, 100_000).await;
    let y = endpoint("y", 8, 2, 100_001).await;
    let sources: Vec<SharedSource> = vec![
        Arc::new(HttpSource::new("x", template(&x), client.clone()).with_declared_total(8)),
        Arc::new(HttpSource::new("y", template(&y), client).with_declared_total(8)),
    ];

    let search = FederatedSearch::with_moka_store(config).expect("controller");
    let params = QueryParameters::new()
        .with(SEARCH_TERMS, "records")
        .with(COUNT, "4")
        .with(START_PAGE, "2");
    let page = search.page(&sources, &params, None).await.expect("page");

    assert_eq!(page.ids(), ["y3", "x3", "y4", "x4"]);
    assert_eq!(page.total_results, 16);
    assert!(!page.has_failures());
}

#[tokio::test]
async fn unreachable_endpoint_is_reported_not_fatal() {
    let config = FederationConfig {
        source_timeout_seconds: 2,
        ..Default::default()
    };
    let client = build_client(&config).expect("client");

    let live = endpoint("live", 5, 1, 1_000).await;
    let dead = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&dead)
        .await;

    let sources: Vec<SharedSource> = vec![
        Arc::new(HttpSource::new("live", template(&live), client.clone()).with_declared_total(5)),
        Arc::new(
            HttpSource::new("dead", template(&dead), client)
                .with_declared_total(5)
                .with_help_link("https://dead.example/status"),
        ),
    ];

    let search = FederatedSearch::with_moka_store(config).expect("controller");
    let params = QueryParameters::new().with(COUNT, "3");
    let page = search.page(&sources, &params, None).await.expect("page");

    assert_eq!(page.ids(), ["live1", "live2", "live3"]);
    assert_eq!(page.failures.len(), 1);
    assert_eq!(page.failures[0].source, "dead");
    assert!(page.failures[0].message.contains("500"));
    assert_eq!(page.failures[0].help_link.as_deref(), Some("https://dead.example/status"));
}

#[tokio::test]
async fn single_undeclared_endpoint_is_probed_incrementally() {
    let config = FederationConfig {
        probe_batch_size: 4,
        ..Default::default()
    };
    let client = build_client(&config).expect("client");
    let open = endpoint("o", 10, 1, 1_000).await;
    let sources: Vec<SharedSource> = vec![Arc::new(HttpSource::new("open", template(&open), client))];

    let search = FederatedSearch::with_moka_store(config).expect("controller");
    let params = QueryParameters::new().with(COUNT, "3").with(START_PAGE, "2");
    let page = search.page(&sources, &params, None).await.expect("page");

    assert_eq!(page.ids(), ["o4", "o5", "o6"]);
    // The endpoint reports its total, which wins over the running count.
    assert_eq!(page.total_results, 10);
}
