//! End-to-end runs against a served copy of the price page.

use gold_ledger::config::Config;
use gold_ledger::error::{FetchError, PipelineError};
use gold_ledger::pipeline::Pipeline;
use gold_ledger::store::auth::AccessToken;
use gold_ledger::store::memory::MemoryStore;
use gold_ledger::store::sheets::SheetsStore;
use gold_ledger::store::STORE_HEADER;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = include_str!("fixtures/harga-emas.html");

async fn serve_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/harga-emas"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config {
        url: format!("{}/harga-emas", server.uri()),
        ..Config::default()
    };
    config.fetch_retry = config.fetch_retry.without_delay();
    config.store_retry = config.store_retry.without_delay();
    config
}

#[tokio::test]
async fn test_fixture_page_into_memory_store() {
    let server = MockServer::start().await;
    serve_page(&server).await;

    let pipeline = Pipeline::new(config_for(&server)).unwrap();
    let store = MemoryStore::new();
    let report = pipeline.run(&store).await.unwrap();

    assert_eq!(
        report.sections,
        vec!["GALERI 24", "ANTAM", "Dinar G24", "ANTAM NON PEGADAIAN", "UBS"]
    );
    assert_eq!(report.failed_sections, 0);
    // One header row per section fails price parsing.
    assert_eq!(report.extracted, 15);
    assert_eq!(report.dropped, 5);
    assert_eq!(report.valid, 10);
    assert_eq!(report.appended, 10);
    assert!(report.wrote_header);

    let rows = store.snapshot();
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0], STORE_HEADER.map(String::from).to_vec());
    assert!(rows[1..].iter().all(|r| r[0] == report.timestamp));

    let antam = rows.iter().find(|r| r[2] == "ANTAM" && r[3] == "1 gram").unwrap();
    assert_eq!(antam[4], "1450000");
    assert_eq!(antam[5], "1290000");
}

#[tokio::test]
async fn test_rerun_of_same_scrape_appends_nothing() {
    let server = MockServer::start().await;
    serve_page(&server).await;

    let pipeline = Pipeline::new(config_for(&server)).unwrap();
    let store = MemoryStore::with_header();
    let outcome = pipeline.scrape().await.unwrap();

    let first = pipeline.commit(outcome.clone(), &store).await.unwrap();
    let second = pipeline.commit(outcome, &store).await.unwrap();

    assert_eq!(first.appended, 10);
    assert_eq!(second.appended, 0);
    assert_eq!(second.duplicates, 10);
    assert_eq!(store.snapshot().len(), 11);
}

#[tokio::test]
async fn test_fetch_recovers_from_transient_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/harga-emas"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    serve_page(&server).await;

    let pipeline = Pipeline::new(config_for(&server)).unwrap();
    let report = pipeline.run(&MemoryStore::with_header()).await.unwrap();
    assert_eq!(report.appended, 10);
}

#[tokio::test]
async fn test_forbidden_page_fails_run_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(config_for(&server)).unwrap();
    let store = MemoryStore::with_header();
    let err = pipeline.run(&store).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fetch(FetchError::Status { status: 403, .. })
    ));
    assert_eq!(store.snapshot().len(), 1);
}

#[tokio::test]
async fn test_run_against_sheets_api() {
    let page = MockServer::start().await;
    serve_page(&page).await;

    let sheets = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/'Galeri24'!A:F"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Galeri24!A1:F1",
            "majorDimension": "ROWS",
            "values": [STORE_HEADER]
        })))
        .expect(1)
        .mount(&sheets)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-123/values/'Galeri24'!A1:append"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "sheet-123",
            "updates": { "updatedRows": 10 }
        })))
        .expect(1)
        .mount(&sheets)
        .await;

    let pipeline = Pipeline::new(config_for(&page)).unwrap();
    let store = SheetsStore::new(
        reqwest::Client::new(),
        &sheets.uri(),
        "sheet-123",
        "Galeri24",
        AccessToken::new("test-token"),
    );
    let report = pipeline.run(&store).await.unwrap();

    assert_eq!(report.appended, 10);
    assert!(!report.wrote_header);

    let requests = sheets.received_requests().await.unwrap();
    let append = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&append.body).unwrap();
    let values = body["values"].as_array().unwrap();
    assert_eq!(values.len(), 10);
    assert_eq!(values[0][0], json!(report.timestamp));
    assert!(values[0][4].is_i64());
}
