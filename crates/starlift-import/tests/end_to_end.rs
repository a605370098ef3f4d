//! End-to-end import scenarios against a wiremock Northstar instance.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use starlift_client::ApiClient;
use starlift_core::{AppConfig, Environment};
use starlift_import::entity::contacts;
use starlift_import::ImportError;

fn test_config(uri: &str, workdir: &TempDir, timeout_secs: u64) -> AppConfig {
    AppConfig {
        uri: uri.to_string(),
        username: "importer".into(),
        password: "secret".into(),
        env: Environment::Test,
        log_level: "info".into(),
        default_city: None,
        default_county: None,
        request_timeout_secs: timeout_secs,
        concurrency: 10,
        log_dir: workdir.path().join("log_output"),
        cache_path: workdir.path().join("address_cache.json"),
        cache_ttl_days: 90,
        debit_adjustment_id: None,
        credit_adjustment_id: None,
    }
}

fn write_import_file(workdir: &TempDir, contents: &str) -> PathBuf {
    let path = workdir.path().join("import.csv");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[tokio::test]
async fn three_row_import_records_one_success_and_two_failures() {
    let server = MockServer::start().await;
    let workdir = TempDir::new().unwrap();

    // Row 1 succeeds.
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/1/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 1}})))
        .mount(&server)
        .await;

    // Row 2 is rejected with a structured validation message.
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/2/contacts"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"error": {"message": ["Name is required"]}})),
        )
        .mount(&server)
        .await;

    // Row 3 times out: the response is slower than the client timeout.
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/3/contacts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"id": 3}}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), &workdir, 1);
    let client = ApiClient::from_config(&config).unwrap();
    let file = write_import_file(&workdir, "1,Alice\n2,Bob\n3,Carol\n");

    let summary = contacts::import(&client, &config, &file).await.unwrap();

    assert_eq!(summary.successes, 1);
    assert_eq!(summary.failures, 2);

    let success_lines = fs::read_to_string(&summary.success_log).unwrap();
    assert_eq!(success_lines.lines().count(), 1);
    assert!(success_lines.contains("account ID 1"));

    let failure_lines: Vec<String> = fs::read_to_string(&summary.failure_log)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(failure_lines.len(), 2);
    for line in &failure_lines {
        let reason = line.rsplit(',').next().unwrap();
        assert!(!reason.trim().is_empty(), "failure line must end in a reason: {line}");
    }
    assert!(failure_lines.iter().any(|l| l.contains("Name is required")));
    assert!(failure_lines
        .iter()
        .any(|l| l.contains("No response received")));
}

#[tokio::test]
async fn missing_required_column_aborts_before_any_network_call() {
    let server = MockServer::start().await;
    let workdir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), &workdir, 5);
    let client = ApiClient::from_config(&config).unwrap();
    let file = write_import_file(&workdir, "1,Alice\n2,\n");

    let result = contacts::import(&client, &config, &file).await;

    match result {
        Err(ImportError::Validation(row_error)) => {
            assert_eq!(row_error.row, 2);
            assert_eq!(row_error.column, 2);
            assert!(row_error.message.contains("required"));
        }
        other => panic!("expected a fatal validation error, got: {other:?}"),
    }
    // Dropping the server verifies the expect(0) — no request was made.
}

#[tokio::test]
async fn summary_reconciles_against_submitted_rows() {
    let server = MockServer::start().await;
    let workdir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), &workdir, 5);
    let client = ApiClient::from_config(&config).unwrap();

    let rows: String = (1..=25).map(|i| format!("{i},Contact {i}\n")).collect();
    let file = write_import_file(&workdir, &rows);

    let summary = contacts::import(&client, &config, &file).await.unwrap();
    assert_eq!(summary.successes + summary.failures, 25);
    assert_eq!(summary.successes, 25);
}
