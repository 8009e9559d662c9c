//! HTTP surface tests: the router is driven in-process with `oneshot`.

#![cfg(feature = "server")]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{card_reply, FakeExtractor, Reply, ScriptedCompletion, PDF_BYTES};
use http_body_util::BodyExt;
use pdf2cards::server::{create_router, AppState};
use pdf2cards::{CardConfig, CardSchema, CompletionSource, TextExtractor};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "pdf2cards-test-boundary";

struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/cards")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn pdf_part() -> Part<'static> {
    Part {
        name: "file",
        filename: Some("paper.pdf"),
        content_type: Some("application/pdf"),
        data: PDF_BYTES,
    }
}

struct TestApp {
    extractor: Arc<FakeExtractor>,
    completion: Arc<ScriptedCompletion>,
    router: axum::Router,
}

fn test_app(extractor: FakeExtractor, completion: ScriptedCompletion) -> TestApp {
    let extractor = Arc::new(extractor);
    let completion = Arc::new(completion);
    let state = AppState::new(
        extractor.clone() as Arc<dyn TextExtractor>,
        completion.clone() as Arc<dyn CompletionSource>,
        CardConfig::default(),
    );
    TestApp {
        extractor,
        completion,
        router: create_router(state),
    }
}

fn happy_app() -> TestApp {
    test_app(
        FakeExtractor::returning("Bees dance. They share food."),
        ScriptedCompletion::new(vec![Reply::Text(card_reply(&CardSchema::hook(), "bee"))]),
    )
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = happy_app();
    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn pdf_upload_returns_cards_in_schema_order() {
    let app = happy_app();
    let response = app
        .router
        .oneshot(upload_request(&[pdf_part()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with(r#"{"hook":"bee hook","question":"bee question""#), "{text}");
    assert_eq!(app.extractor.calls(), 1);
    assert_eq!(app.completion.calls(), 1);
}

#[tokio::test]
async fn text_upload_is_rejected_before_any_work() {
    let app = happy_app();
    let response = app
        .router
        .oneshot(upload_request(&[Part {
            name: "file",
            filename: Some("notes.txt"),
            content_type: Some("text/plain"),
            data: b"hello",
        }]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Failed to generate cards");
    assert_eq!(body["kind"], "input");
    assert!(body["error"].as_str().unwrap().contains("Only PDF files are allowed"));
    assert_eq!(app.extractor.calls(), 0);
    assert_eq!(app.completion.calls(), 0);
}

#[tokio::test]
async fn empty_form_is_bad_request() {
    let app = happy_app();
    let response = app.router.oneshot(upload_request(&[])).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["kind"], "input");
}

#[tokio::test]
async fn file_and_url_together_is_bad_request() {
    let app = happy_app();
    let response = app
        .router
        .oneshot(upload_request(&[
            pdf_part(),
            Part {
                name: "url",
                filename: None,
                content_type: None,
                data: b"https://example.com/paper.pdf",
            },
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.extractor.calls(), 0);
}

#[tokio::test]
async fn url_endpoint_rejects_non_http_url() {
    let app = happy_app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cards/url")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url": "ftp://example.com/paper.pdf"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.extractor.calls(), 0);
}

#[tokio::test]
async fn completion_failure_is_bad_gateway() {
    let app = test_app(
        FakeExtractor::returning("Some text."),
        ScriptedCompletion::new(vec![Reply::Fail("rate limited".into())]),
    );
    let response = app.router.oneshot(upload_request(&[pdf_part()])).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "completion");
    assert!(body["error"].as_str().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn reply_without_json_is_bad_gateway() {
    let app = test_app(
        FakeExtractor::returning("Some text."),
        ScriptedCompletion::always("Sorry, I can't help with that."),
    );
    let response = app.router.oneshot(upload_request(&[pdf_part()])).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["kind"], "no_json_structure_found");
}

#[tokio::test]
async fn empty_extraction_is_unprocessable() {
    let app = test_app(
        FakeExtractor::returning(""),
        ScriptedCompletion::always("{}"),
    );
    let response = app.router.oneshot(upload_request(&[pdf_part()])).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["kind"], "extraction");
    assert_eq!(app.completion.calls(), 0);
}
