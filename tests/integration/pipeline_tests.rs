//! Full pipeline through the router, upstream sources served by mockito

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use kormarc_server::{
    api, config::AppConfig, repository::Repository, services::Services, AppState,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "s3cret";

const LOOKUP: &str = r#"{"item":[{
    "title": "죄와 벌 1",
    "author": "표도르 도스토예프스키 (지은이), 김연경 (옮긴이)",
    "publisher": "민음사",
    "pubDate": "2012-11-30",
    "categoryName": "국내도서>소설/시/희곡>러시아소설",
    "description": "인간의 죄와 구원을 묻는 고전",
    "isbn13": "9788937462788",
    "priceStandard": 13000,
    "subInfo": {
        "originalTitle": "Преступление и наказание",
        "authors": [
            {"authorName": "표도르 도스토예프스키", "authorTypeName": "지은이"},
            {"authorName": "김연경", "authorTypeName": "옮긴이"}
        ]
    },
    "seriesInfo": {"seriesId": 1, "seriesName": "세계문학전집", "volume": "266"}
}]}"#;

const PRODUCT: &str = r#"<html><body>
    <span class="price2">정가 : 13,000원</span>
    <div class="conts_info_list1"><ul><li>492쪽</li><li>132*225mm</li></ul></div>
</body></html>"#;

async fn upstream() -> ServerGuard {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/ttb/api/ItemLookUp.aspx")
        .match_query(Matcher::UrlEncoded("ItemId".into(), "9788937462788".into()))
        .with_body(LOOKUP)
        .create_async()
        .await;
    server
        .mock("GET", "/ttb/api/ItemLookUp.aspx")
        .match_query(Matcher::UrlEncoded("ItemId".into(), "9791190000000".into()))
        .with_body(r#"{"item":[]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/search/wsearchresult.aspx")
        .match_query(Matcher::Any)
        .with_body("<html><body></body></html>")
        .create_async()
        .await;
    server
        .mock("GET", "/shop/wproduct.aspx")
        .match_query(Matcher::Any)
        .with_body(PRODUCT)
        .create_async()
        .await;
    server
        .mock("GET", "/seoji")
        .match_query(Matcher::Any)
        .with_body(r#"{"docs":[{"AUTHOR":"도스토예프스키 지음 ; 김연경 옮김","EA_ADD_CODE":"04890"}]}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex(r#""max_tokens":8[,}]"#.to_string()))
        .with_body(json!({"choices":[{"message":{"role":"assistant","content":"892.83"}}]}).to_string())
        .create_async()
        .await;
    server
}

async fn app(url: &str) -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations apply");

    let mut config = AppConfig::default();
    config.server.admin_token = Some(ADMIN_TOKEN.to_string());
    config.http.retries = 0;
    config.aladin.ttb_key = Some("ttb".to_string());
    config.aladin.api_url = format!("{}/ttb/api/ItemLookUp.aspx", url);
    config.aladin.web_url = url.to_string();
    config.nlk.cert_key = Some("cert".to_string());
    config.nlk.seoji_endpoints = vec![format!("{}/seoji", url)];
    config.wikidata.enabled = false;
    config.openai.api_key = Some("sk-test".to_string());
    config.openai.base_url = format!("{}/v1", url);
    config.registry.kpipa_url = url.to_string();
    config.registry.mcst_url = url.to_string();
    config.cataloging.use_lod = false;
    config.cataloging.ai_940 = false;

    let repository = Repository::new(pool);
    repository
        .publishers
        .create_publisher(&serde_json::from_value(json!({
            "name": "(주)민음사",
            "address": "서울특별시 강남구 도산대로1길 62"
        }))
        .expect("publisher payload"))
        .await
        .expect("seed publisher");

    let services = Services::new(repository, &config).expect("services");
    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, content_type, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

#[tokio::test]
async fn test_health_and_ready() {
    let server = upstream().await;
    let app = app(&server.url()).await;

    let (status, _, body) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");

    let (status, _, body) = send(&app, get("/api/v1/ready")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_single_conversion() {
    let server = upstream().await;
    let app = app(&server.url()).await;

    let (status, _, body) = send(
        &app,
        get("/api/v1/records/978-89-374-6278-8?reg_mark=EM&reg_no=7&copy_symbol=2"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["isbn"], "9788937462788");

    let lines: Vec<String> = body["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l.as_str().unwrap().to_string())
        .collect();
    assert!(lines.contains(&"=007  ta".to_string()));
    assert!(lines.contains(&"=020  \\\\$a9788937462788$g04890:$c13000".to_string()));
    assert!(lines.contains(&"=041  1\\$akor$hrus".to_string()));
    assert!(lines.contains(&"=049  \\\\$IEM7$f2".to_string()));
    assert!(lines.contains(&"=056  \\\\$a892.83$26".to_string()));
    assert!(lines.contains(&"=950  0\\$b13000".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("=245  00$a죄와 벌")));
    assert!(lines.iter().any(|l| l.starts_with("=260  \\\\$a서울 :$b민음사,$c2012.")));

    let tags: Vec<&str> = lines.iter().map(|l| &l[1..4]).collect();
    let mut sorted = tags.clone();
    sorted.sort();
    assert_eq!(tags, sorted);

    let meta = &body["meta"];
    assert_eq!(meta["kdc_code"], "892.83");
    assert_eq!(meta["country_code"], "ulk");
    assert_eq!(meta["location_source"], "KPIPA_DB");
    assert_eq!(meta["has_n"], true);
    assert_eq!(&meta["line_008"].as_str().unwrap()[21..24], "ulk");
}

#[tokio::test]
async fn test_batch_and_mrk_export() {
    let server = upstream().await;
    let app = app(&server.url()).await;

    let request = json!({
        "items": [{"isbn": "9788937462788"}, {"isbn": "9791190000000"}],
        "use_ai_940": false
    });
    let (status, _, body) = send(&app, post_json("/api/v1/records", request.clone(), None)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["ok"], true);
    assert_eq!(results[1]["ok"], false);
    assert_eq!(results[1]["isbn"], "9791190000000");

    let (status, content_type, body) = send(&app, post_json("/api/v1/records/mrk", request, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with("=007  ta"));
    assert!(!text.contains("\n\n"));
}

#[tokio::test]
async fn test_invalid_requests() {
    let server = upstream().await;
    let app = app(&server.url()).await;

    let (status, _, _) = send(&app, get("/api/v1/records/12345")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, post_json("/api/v1/records", json!({"items": []}), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, get("/api/v1/publishers/location")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registry_writes_need_admin_token() {
    let server = upstream().await;
    let app = app(&server.url()).await;
    let publisher = json!({"name": "교유서가", "address": "경기도 파주시 회동길 210"});

    let (status, _, _) = send(&app, post_json("/api/v1/publishers", publisher.clone(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app, post_json("/api/v1/publishers", publisher.clone(), Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(&app, post_json("/api/v1/publishers", publisher, Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::CREATED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["name"], "교유서가");
    let created_id = body["id"].as_i64().expect("id");

    let (status, _, body) = send(&app, get("/api/v1/publishers/location?publisher=%EA%B5%90%EC%9C%A0%EC%84%9C%EA%B0%80")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["source"], "KPIPA_DB");
    assert_eq!(body["place_display"], "파주");
    assert_eq!(body["country_code"], "ggk");

    let import = json!({
        "publishers": [{"name": "창비", "address": "경기도 파주시 회동길 184"}],
        "imprints": [{"entry": "창비 / 창비교육"}]
    });
    let (status, _, body) = send(&app, post_json("/api/v1/registry/import", import, Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["publishers"], 1);
    assert_eq!(body["imprints"], 1);

    let (status, _, _) = send(&app, delete(&format!("/api/v1/publishers/{}", created_id), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_regions_are_seeded() {
    let server = upstream().await;
    let app = app(&server.url()).await;

    let (status, _, body) = send(&app, get("/api/v1/regions")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    let regions = body.as_array().unwrap();
    assert!(regions.iter().any(|r| r["region"] == "서울" && r["country_code"] == "ulk"));
}
