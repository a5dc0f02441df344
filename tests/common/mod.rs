#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use dental_forensics::api::{self, AppState};
use dental_forensics::config::Config;
use http_body_util::BodyExt;
use image::{GrayImage, Luma};
use serde_json::Value;
use tower::ServiceExt;

/// Full router over a fresh, empty session store.
pub fn build_test_app() -> Router {
    build_test_app_with(Config::default())
}

pub fn build_test_app_with(config: Config) -> Router {
    api::app(Arc::new(AppState::new(config)))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// POST a raw JSON-typed body, well-formed or not.
pub async fn post_raw(app: &Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// POST /sessions and return the new id.
pub async fn create_session(app: &Router, body: Value) -> String {
    let response = post_json(app, "/sessions", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["id"].as_str().unwrap().to_string()
}

/// Write a single-level grey PNG and return its path.
pub fn write_flat_png(dir: &Path, name: &str, width: u32, height: u32, level: u8) -> PathBuf {
    let path = dir.join(name);
    GrayImage::from_pixel(width, height, Luma([level]))
        .save(&path)
        .unwrap();
    path
}
