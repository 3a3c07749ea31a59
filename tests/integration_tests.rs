//! Integration tests using a mock HTTP server
//!
//! Exercises the full flow: resource accessor → cache probe → paginated
//! fetch → materialized table → cache write.

use futures::StreamExt;
use marlin::table::materialize;
use marlin::{Client, Error, ListQuery, ProjectSearch, Record, RetryConfig, Table};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT_ID: &str = "abc";
const CREATED_ON: &str = "2023-01-01 00:00:00";

fn obs_path() -> String {
    format!("/projects/{PROJECT_ID}/benthicpits/obstransectbenthicpits/")
}

fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other:?}"),
    }
}

fn one_record_body() -> serde_json::Value {
    json!({
        "count": 1,
        "next": null,
        "results": [
            {
                "id": "1",
                "site": "north reef",
                "latitude": "34.0522",
                "longitude": "-118.2437",
                "project_id": PROJECT_ID,
                "created_on": CREATED_ON,
            }
        ],
    })
}

fn two_record_body() -> serde_json::Value {
    json!({
        "count": 2,
        "next": null,
        "results": [
            {
                "id": "1",
                "site": "north reef",
                "latitude": "34.0522",
                "longitude": "-118.2437",
                "project_id": PROJECT_ID,
                "created_on": CREATED_ON,
            },
            {
                "id": "2",
                "site": "south reef",
                "latitude": "49.0522",
                "longitude": "-110.3434",
                "project_id": PROJECT_ID,
                "created_on": CREATED_ON,
            },
        ],
    })
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(10),
    }
}

fn client(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .token("test-token")
        .retry(fast_retry())
        .build()
}

fn cached_client(server: &MockServer, cache_dir: &TempDir) -> Client {
    Client::builder()
        .base_url(server.uri())
        .token("test-token")
        .retry(fast_retry())
        .cache_dir(cache_dir.path())
        .build()
}

async fn mount_probe(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(obs_path()))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_full(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(obs_path()))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ============================================================================
// Fetch and Materialize
// ============================================================================

#[tokio::test]
async fn test_observations_fetch() {
    let server = MockServer::start().await;
    mount_full(&server, two_record_body()).await;

    let table = client(&server)
        .benthic_pit()
        .observations(PROJECT_ID)
        .await
        .unwrap();

    assert_eq!(table.n_rows(), 2);
    assert_eq!(table.value(0, "site"), Some(&json!("north reef")));
    assert_eq!(table.value(1, "id"), Some(&json!("2")));
}

#[tokio::test]
async fn test_empty_collection_yields_empty_table() {
    let server = MockServer::start().await;
    mount_full(&server, json!({"count": 0, "next": null, "results": []})).await;

    let table = client(&server)
        .benthic_pit()
        .observations(PROJECT_ID)
        .await
        .unwrap();

    assert!(table.is_empty());
    assert_eq!(table.n_columns(), 0);
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(obs_path()))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_record_body()))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .benthic_pit()
        .observations(PROJECT_ID)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_auth_required_before_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_record_body()))
        .expect(0)
        .mount(&server)
        .await;

    let unauthenticated = Client::builder().base_url(server.uri()).build();
    let err = unauthenticated
        .benthic_pit()
        .observations(PROJECT_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AuthRequired));
}

#[tokio::test]
async fn test_multi_page_fetch_is_complete() {
    let server = MockServer::start().await;
    let uri = server.uri();
    let next = format!("{uri}{}?page=2", obs_path());

    // 60 records at limit 10: enough remaining pages for the concurrent path.
    let page = |start: u64, next: Option<&str>| {
        json!({
            "count": 60,
            "next": next,
            "results": (start..start + 10)
                .map(|id| json!({"id": id.to_string(), "created_on": CREATED_ON}))
                .collect::<Vec<_>>(),
        })
    };

    Mock::given(method("GET"))
        .and(path(obs_path()))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, Some(&next))))
        .expect(1)
        .mount(&server)
        .await;
    for page_index in 2..=6u64 {
        Mock::given(method("GET"))
            .and(path(obs_path()))
            .and(query_param("page", page_index.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page((page_index - 1) * 10, Some(&next))),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let table = client(&server)
        .table(&ListQuery::new(obs_path()).param("limit", "10"))
        .await
        .unwrap();

    assert_eq!(table.n_rows(), 60);

    // First page order is preserved; the full set has no duplicates.
    let ids: Vec<u64> = table
        .column("id")
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().parse().unwrap())
        .collect();
    assert_eq!(&ids[..10], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..60).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_stream_records() {
    let server = MockServer::start().await;
    mount_full(&server, two_record_body()).await;

    let client = client(&server);
    let mut stream = client.stream(&ListQuery::new(obs_path())).unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first["id"], json!("1"));
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second["id"], json!("2"));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_fetch_single_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/choices/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "results": [{"name": "reef_type"}],
        })))
        .mount(&server)
        .await;

    let body = client(&server)
        .fetch(&ListQuery::new("/choices/").public())
        .await
        .unwrap();

    assert_eq!(body["results"][0]["name"], "reef_type");
}

#[tokio::test]
async fn test_project_search_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/"))
        .and(query_param("showall", "t"))
        .and(query_param("status", "90"))
        .and(query_param("tags", "ngo,gov"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "results": [{"id": "p-1", "name": "Reef Watch"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let table = client(&server)
        .projects()
        .search(&ProjectSearch {
            tags: vec!["ngo".to_string(), "gov".to_string()],
            include_test_projects: false,
        })
        .await
        .unwrap();

    assert_eq!(table.n_rows(), 1);
    assert_eq!(table.value(0, "name"), Some(&json!("Reef Watch")));
}

#[tokio::test]
async fn test_retry_ceiling_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(obs_path()))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(5)
        .mount(&server)
        .await;

    let err = client(&server)
        .benthic_pit()
        .observations(PROJECT_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_summary_rename_projection_flatten() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/summarysampleevents/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "results": [{
                "id": "se-1",
                "project_name": "Reef Watch",
                "tags": ["ngo"],
                "country_name": "Fiji",
                "site_name": "north reef",
                "latitude": -17.7,
                "longitude": 177.4,
                "reef_type": "fringing",
                "reef_zone": "back reef",
                "reef_exposure": "sheltered",
                "management_name": "no-take",
                "sample_date": "2023-03-10",
                "data_policy_beltfish": "public summary",
                "data_policy_benthiclit": "public summary",
                "data_policy_benthicpit": "public summary",
                "data_policy_benthicpqt": "public summary",
                "data_policy_habitatcomplexity": "public summary",
                "data_policy_bleachingqc": "public summary",
                "project_notes": "",
                "site_notes": "",
                "management_notes": "",
                "contact_link": "https://example.com",
                "protocols": {"beltfish": {"sample_unit_count": 3}},
            }],
        })))
        .mount(&server)
        .await;

    let table = client(&server)
        .sample_events()
        .summary(true, true)
        .await
        .unwrap();

    assert_eq!(table.n_rows(), 1);
    // Renamed before projection, flattened afterwards.
    assert!(table.has_column("project"));
    assert!(table.has_column("country"));
    assert!(!table.has_column("project_name"));
    assert!(!table.has_column("id"));
    assert!(!table.has_column("protocols"));
    assert_eq!(
        table.value(0, "protocols.beltfish"),
        Some(&json!({"sample_unit_count": 3}))
    );
}

// ============================================================================
// Freshness Cache
// ============================================================================

#[tokio::test]
async fn test_fetch_populates_cache() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();
    mount_probe(&server, one_record_body()).await;
    mount_full(&server, two_record_body()).await;

    let client = cached_client(&server, &cache_dir);
    let query = ListQuery::new(obs_path());

    let table = client.table(&query).await.unwrap();
    assert_eq!(table.n_rows(), 2);

    let entries: Vec<_> = std::fs::read_dir(cache_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|name| name.ends_with(".json.gz")));
    assert!(entries.iter().any(|name| name.ends_with(".idx")));
}

#[tokio::test]
async fn test_cached_table_served_without_full_fetch() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    // Only the single-record probe is mocked; the full endpoint would 404.
    mount_probe(&server, one_record_body()).await;

    let client = cached_client(&server, &cache_dir);
    let query = ListQuery::new(obs_path());

    let two_rows = materialize(
        two_record_body()["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| record(v.clone()))
            .collect(),
        None,
        None,
    )
    .unwrap();
    client.write_cache(&query, two_rows).unwrap();

    let table = client.table(&query).await.unwrap();
    assert_eq!(table.n_rows(), 2);
}

#[tokio::test]
async fn test_cache_idempotent_while_token_unchanged() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();
    mount_probe(&server, one_record_body()).await;

    Mock::given(method("GET"))
        .and(path(obs_path()))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_record_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = cached_client(&server, &cache_dir);
    let query = ListQuery::new(obs_path());

    let first = client.table(&query).await.unwrap();
    let second = client.table(&query).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cache_invalidated_on_token_change() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();
    let client = cached_client(&server, &cache_dir);
    let query = ListQuery::new(obs_path());

    // An entry stored under an older token than the server now reports.
    let stale = Table::from_records(vec![record(json!({
        "id": "0",
        "site": "old reef",
        "created_on": "2022-01-01 00:00:00",
    }))]);
    client.write_cache(&query, stale).unwrap();

    mount_probe(&server, one_record_body()).await;
    mount_full(&server, two_record_body()).await;

    assert!(client.read_cache(&query).await.unwrap().is_none());

    let table = client.table(&query).await.unwrap();
    assert_eq!(table.n_rows(), 2);
    assert_eq!(table.value(0, "site"), Some(&json!("north reef")));
}

#[tokio::test]
async fn test_read_cache_without_entry_misses() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();
    mount_probe(&server, one_record_body()).await;

    let client = cached_client(&server, &cache_dir);
    let cached = client.read_cache(&ListQuery::new(obs_path())).await.unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_write_cache_empty_table_is_noop() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();
    let client = cached_client(&server, &cache_dir);

    let table = client
        .write_cache(&ListQuery::new(obs_path()), Table::empty())
        .unwrap();

    assert!(table.is_empty());
    assert_eq!(std::fs::read_dir(cache_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_fetch_without_freshness_field_not_cached() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    let body = json!({
        "count": 1,
        "next": null,
        "results": [{"id": "1", "site": "north reef"}],
    });
    mount_probe(&server, body.clone()).await;
    mount_full(&server, body).await;

    let client = cached_client(&server, &cache_dir);
    let table = client.table(&ListQuery::new(obs_path())).await.unwrap();

    assert_eq!(table.n_rows(), 1);
    assert_eq!(std::fs::read_dir(cache_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_probe_failure_surfaces() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(obs_path()))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = cached_client(&server, &cache_dir);
    let err = client
        .read_cache(&ListQuery::new(obs_path()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

// ============================================================================
// Rendering
// ============================================================================

#[tokio::test]
async fn test_fetched_table_renders_as_geojson() {
    let server = MockServer::start().await;
    mount_full(&server, two_record_body()).await;

    let table = client(&server)
        .benthic_pit()
        .observations(PROJECT_ID)
        .await
        .unwrap();
    let geojson: serde_json::Value =
        serde_json::from_str(&marlin::to_geojson(&table).unwrap().unwrap()).unwrap();

    assert_eq!(geojson["features"].as_array().unwrap().len(), 2);
    assert_eq!(
        geojson["features"][0]["geometry"]["coordinates"],
        json!(["-118.2437", "34.0522"])
    );
}
