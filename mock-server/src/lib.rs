use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/status/{code}", get(status))
        .route("/echo", post(echo))
        .route("/request-headers/{name}", get(request_headers).post(request_headers))
        .route("/duplicate-headers", get(duplicate_headers))
        .route("/slow/{millis}", get(slow))
        .route("/bytes/{len}", get(payload))
        .route("/note", get(note))
        .route("/redirect", get(redirect))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Respond with the requested status code.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn echo(headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    tracing::debug!(len = body.len(), ?content_type, "echo");
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// Every value received for header `name`, in arrival order.
async fn request_headers(Path(name): Path<String>, headers: HeaderMap) -> Json<Vec<String>> {
    let values = headers
        .get_all(name.as_str())
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect();
    Json(values)
}

async fn duplicate_headers() -> Response {
    let mut headers = HeaderMap::new();
    headers.append("x-dup", HeaderValue::from_static("1"));
    headers.append("x-dup", HeaderValue::from_static("2"));
    (headers, "duplicated").into_response()
}

async fn slow(Path(millis): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    "done"
}

async fn payload(Path(len): Path<usize>) -> Vec<u8> {
    vec![b'x'; len]
}

async fn note() -> Json<Note> {
    Json(Note {
        id: Uuid::new_v4(),
        title: "declared".to_string(),
    })
}

async fn redirect() -> Redirect {
    Redirect::temporary("/note")
}
