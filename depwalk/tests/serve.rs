use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use depwalk::core::{Config, FetchFailurePolicy};
use depwalk::ops;
use depwalk_test_support::document::DocumentBuilder;
use depwalk_test_support::registry::http::HttpRegistry;

/// Starts the HTTP entry point in the current runtime and returns its base URL.
fn spawn_server(registry: &HttpRegistry, policy: FetchFailurePolicy) -> String {
    let config = Config::builder()
        .registry_url(Url::parse(registry.url()).unwrap())
        .idle_interval(Duration::from_millis(1))
        .fetch_failure_policy(policy)
        .build()
        .unwrap();
    let walker = Arc::new(ops::walker(&config).unwrap());

    let tcp = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = tcp.local_addr().unwrap();
    let server = axum::Server::from_tcp(tcp)
        .unwrap()
        .serve(ops::router(walker).into_make_service());
    tokio::spawn(server);

    format!("http://{addr}/")
}

fn registry() -> HttpRegistry {
    let mut registry = HttpRegistry::serve();
    registry
        .publish(
            DocumentBuilder::new("app")
                .release("1.0.0", &[("lib", "^1")])
                .release("2.0.0", &[("lib", "^2"), ("failing", "*")]),
        )
        .publish(
            DocumentBuilder::new("lib")
                .release("1.1.0", &[])
                .release("2.3.0", &[]),
        )
        .publish(DocumentBuilder::new("failing").release("1.0.0", &[]))
        .fail("failing");
    registry
}

async fn get(url: &str, query: &[(&str, &str)]) -> (StatusCode, String) {
    let response = reqwest::Client::new()
        .get(url)
        .query(query)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

fn edges(body: &str) -> Vec<String> {
    let graph: Value = serde_json::from_str(body).unwrap();
    graph["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|edge| edge.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resolves_requested_version() {
    let registry = registry();
    let url = spawn_server(&registry, FetchFailurePolicy::Prune);

    let (status, body) = get(&url, &[("name", "app"), ("version", "^1.0.0")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(edges(&body), vec!["app@1.0.0->lib@1.1.0"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn version_defaults_to_latest() {
    let registry = registry();
    let url = spawn_server(&registry, FetchFailurePolicy::Prune);

    let (status, body) = get(&url, &[("name", "app")]).await;

    assert_eq!(status, StatusCode::OK);
    // `failing` responds with 500 and is pruned.
    assert_eq!(edges(&body), vec!["app@2.0.0->lib@2.3.0"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_name_is_bad_request() {
    let registry = registry();
    let url = spawn_server(&registry, FetchFailurePolicy::Prune);

    let (status, body) = get(&url, &[("version", "1.0.0")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "missing `name` query parameter");

    let (status, _) = get(&url, &[("name", "  ")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_name_is_bad_request() {
    let registry = registry();
    let url = spawn_server(&registry, FetchFailurePolicy::Prune);

    let (status, body) = get(&url, &[("name", "not valid")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "invalid character ` ` in package name: `not valid`");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hard_failure_is_server_error() {
    let registry = registry();
    let url = spawn_server(&registry, FetchFailurePolicy::Abort);

    let (status, body) = get(&url, &[("name", "app"), ("version", "2")]).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        "dependency walk aborted while processing `failing *` (required by app@2.0.0): \
        registry responded with status 500 when fetching `failing`"
    );
}
