//! HTTP response building module
//!
//! JSON and passthrough response builders shared by all handlers.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::downstream::Passthrough;
use crate::error::ServiceError;
use crate::logger;

const JSON: &str = "application/json";

/// Build JSON response with compact serialization
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => Response::builder()
            .status(status)
            .header(CONTENT_TYPE, JSON)
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|e| {
                log_build_error(status, &e);
                Response::new(Full::new(Bytes::new()))
            }),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            raw_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"Internal server error"}"#,
            )
        }
    }
}

/// Map a handler error to its JSON body, logging any internal cause
pub fn error_response(err: &ServiceError) -> Response<Full<Bytes>> {
    if let Some(cause) = err.internal_cause() {
        logger::log_error(&cause);
    }
    json_response(err.status_code(), &err.body())
}

/// Forward a downstream reply unchanged
pub fn passthrough_response(reply: Passthrough) -> Response<Full<Bytes>> {
    let content_type = reply
        .content_type
        .unwrap_or_else(|| HeaderValue::from_static(JSON));

    Response::builder()
        .status(reply.status)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(reply.body))
        .unwrap_or_else(|e| {
            log_build_error(reply.status, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    raw_json(StatusCode::NOT_FOUND, r#"{"error":"Not Found"}"#)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &'static str) -> Response<Full<Bytes>> {
    let mut resp = raw_json(
        StatusCode::METHOD_NOT_ALLOWED,
        r#"{"error":"Method Not Allowed"}"#,
    );
    resp.headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    resp
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    raw_json(
        StatusCode::PAYLOAD_TOO_LARGE,
        r#"{"error":"Payload Too Large"}"#,
    )
}

fn raw_json(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
