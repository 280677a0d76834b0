//! Live conversion against a running server and the real upstream sources.
//! Routing, validation and registry behaviour are covered in-process by `pipeline_tests`.

use reqwest::Client;
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8080/api/v1";

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_convert_single_isbn() {
    let client = Client::new();

    let response = client
        .get(format!("{}/records/9788937460449", BASE_URL))
        .query(&[("use_ai_940", "false")])
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["isbn"], "9788937460449");
    let lines = body["lines"].as_array().expect("lines");
    assert!(lines.iter().any(|l| l.as_str().unwrap_or("").starts_with("=245  00$a")));
    assert!(lines.iter().any(|l| l.as_str().unwrap_or("").starts_with("=008  ")));
}
