//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body limits, route matching,
//! error mapping and access logging.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, SERVER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{calculate, echo, payload, store};
use crate::config::AppState;
use crate::error::ServiceResult;
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let mut response = match read_body(req, state.config.http.max_body_size).await {
        Ok(body) => dispatch(&method, &path, &body, &state).await,
        Err(resp) => resp,
    };

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(peer_addr.ip().to_string(), method.to_string(), path);
        entry.status = response.status().as_u16();
        entry.body_bytes = response_size(&response);
        entry.user_agent = user_agent;
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Collect the request body, enforcing `max_body_size`
async fn read_body(
    req: Request<hyper::body::Incoming>,
    max_body_size: u64,
) -> Result<Bytes, Response<Full<Bytes>>> {
    if let Some(size) = declared_length(&req) {
        if size > max_body_size {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            return Err(http::build_413_response());
        }
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeded {max_body_size} bytes"));
            Err(http::build_413_response())
        }
        Err(e) => {
            // Treated like an empty body; handlers answer with their 400
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Ok(Bytes::new())
        }
    }
}

fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn response_size(resp: &Response<Full<Bytes>>) -> usize {
    use hyper::body::Body;
    resp.body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

/// Route a fully-read request to its handler
pub async fn dispatch(
    method: &Method,
    path: &str,
    body: &[u8],
    state: &AppState,
) -> Response<Full<Bytes>> {
    let health = &state.config.health;
    if health.enabled && *method == Method::GET {
        if path == health.liveness_path {
            return http::json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}));
        }
        if path == health.readiness_path {
            return readiness(state).await;
        }
    }

    let result: ServiceResult<Response<Full<Bytes>>> = match (method, path) {
        (&Method::GET, "/start") => Ok(echo::status()),
        (&Method::POST, "/start") => echo::echo(payload::parse(body).as_ref()),
        (_, "/start") => return http::build_405_response("GET, POST"),
        (&Method::POST, "/store-file") => {
            store::store_file(state, payload::parse(body).as_ref()).await
        }
        (&Method::POST, "/calculate") => {
            calculate::calculate(state, payload::parse(body).as_ref()).await
        }
        (_, "/store-file" | "/calculate") => return http::build_405_response("POST"),
        _ => return http::build_404_response(),
    };

    result.unwrap_or_else(|err| http::error_response(&err))
}

async fn readiness(state: &AppState) -> Response<Full<Bytes>> {
    if state.store.is_ready().await {
        http::json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
    } else {
        logger::log_warning(&format!(
            "Readiness check failed: storage directory {} is missing",
            state.store.dir().display()
        ));
        http::json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &serde_json::json!({"status": "unavailable"}),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downstream::test_support;
    use serde_json::{json, Value};
    use std::time::Duration;

    async fn call(
        state: &AppState,
        method: Method,
        path: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let resp = dispatch(&method, path, body.to_string().as_bytes(), state).await;
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn state_without_calculator() -> (tempfile::TempDir, AppState) {
        let tmp = tempfile::tempdir().unwrap();
        let addr = test_support::closed_addr().await;
        let state = AppState::for_tests(tmp.path(), addr, 500);
        (tmp, state)
    }

    #[tokio::test]
    async fn test_start_echoes_banner_and_ip() {
        let (_tmp, state) = state_without_calculator().await;
        let resp = dispatch(
            &Method::POST,
            "/start",
            br#"{"banner":"hello","ip":"1.2.3.4"}"#,
            &state,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, Bytes::from_static(br#"{"banner":"hello","ip":"1.2.3.4"}"#));
    }

    #[tokio::test]
    async fn test_start_accepts_any_value_types() {
        let (_tmp, state) = state_without_calculator().await;
        let (status, body) = call(
            &state,
            Method::POST,
            "/start",
            json!({"banner": {"a": [1, 2]}, "ip": null, "extra": true}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"banner": {"a": [1, 2]}, "ip": null}));
    }

    #[tokio::test]
    async fn test_start_missing_fields() {
        let (_tmp, state) = state_without_calculator().await;
        for body in [json!({}), json!({"banner": "x"}), json!({"ip": "1.2.3.4"}), json!([1])] {
            let (status, reply) = call(&state, Method::POST, "/start", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply, json!({"error": "Invalid JSON input."}));
        }
    }

    #[tokio::test]
    async fn test_start_get_reports_running() {
        let (_tmp, state) = state_without_calculator().await;
        let (status, body) = call(&state, Method::GET, "/start", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Service is running"}));
    }

    #[tokio::test]
    async fn test_store_file_writes_content() {
        let (tmp, state) = state_without_calculator().await;
        let (status, body) = call(
            &state,
            Method::POST,
            "/store-file",
            json!({"file": "a.txt", "data": "hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"file": "a.txt", "message": "Success."}));
        assert_eq!(std::fs::read_to_string(tmp.path().join("a.txt")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_store_file_last_write_wins() {
        let (tmp, state) = state_without_calculator().await;
        for data in ["one", "two"] {
            let (status, _) = call(
                &state,
                Method::POST,
                "/store-file",
                json!({"file": "a.txt", "data": data}),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(std::fs::read_to_string(tmp.path().join("a.txt")).unwrap(), "two");
    }

    #[tokio::test]
    async fn test_store_file_invalid_input() {
        let (_tmp, state) = state_without_calculator().await;

        let (status, body) = call(
            &state,
            Method::POST,
            "/store-file",
            json!({"file": "", "data": "hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"file": null, "error": "Invalid JSON input."}));

        let (status, body) = call(&state, Method::POST, "/store-file", json!({"file": "a.txt"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"file": "a.txt", "error": "Invalid JSON input."}));
    }

    #[tokio::test]
    async fn test_store_file_rejects_traversal() {
        let (tmp, state) = state_without_calculator().await;
        let (status, body) = call(
            &state,
            Method::POST,
            "/store-file",
            json!({"file": "../escape.txt", "data": "hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"file": "../escape.txt", "error": "Invalid file name."}));
        assert!(!tmp.path().parent().unwrap().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_store_file_non_text_data() {
        let (tmp, state) = state_without_calculator().await;
        let (status, body) = call(
            &state,
            Method::POST,
            "/store-file",
            json!({"file": "a.txt", "data": 42}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"file": "a.txt", "error": "Error while storing the file to the storage."})
        );
        assert!(!tmp.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_store_file_io_failure() {
        let (tmp, state) = state_without_calculator().await;
        std::fs::remove_dir_all(tmp.path()).unwrap();
        let (status, body) = call(
            &state,
            Method::POST,
            "/store-file",
            json!({"file": "a.txt", "data": "hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"file": "a.txt", "error": "Error while storing the file to the storage."})
        );
    }

    #[tokio::test]
    async fn test_calculate_unknown_file() {
        let (_tmp, state) = state_without_calculator().await;
        let (status, body) = call(
            &state,
            Method::POST,
            "/calculate",
            json!({"file": "never.txt", "product": "wheat"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"file": "never.txt", "error": "File not found."}));
    }

    #[tokio::test]
    async fn test_calculate_invalid_input() {
        let (_tmp, state) = state_without_calculator().await;
        let (status, body) = call(&state, Method::POST, "/calculate", json!({"product": "x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"file": null, "error": "Invalid JSON input."}));

        let (status, body) = call(&state, Method::POST, "/calculate", json!({"file": "a.txt"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"file": "a.txt", "error": "Invalid JSON input."}));

        let (status, body) = call(
            &state,
            Method::POST,
            "/calculate",
            json!({"file": "../a.txt", "product": "x"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"file": "../a.txt", "error": "Invalid file name."}));
    }

    #[tokio::test]
    async fn test_calculate_passes_through_downstream_reply() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = test_support::spawn(StatusCode::OK, r#"{"result":42}"#, None).await;
        let state = AppState::for_tests(tmp.path(), fake.addr, 5000);
        std::fs::write(tmp.path().join("a.txt"), "product,amount\nwheat,2\n").unwrap();

        let resp = dispatch(
            &Method::POST,
            "/calculate",
            br#"{"file":"a.txt","product":"wheat"}"#,
            &state,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, Bytes::from_static(br#"{"result":42}"#));

        let received = fake.received.lock().unwrap();
        let sent: Value = serde_json::from_slice(&received[0].1).unwrap();
        assert_eq!(sent, json!({"file": "a.txt", "product": "wheat"}));
    }

    #[tokio::test]
    async fn test_calculate_passes_through_downstream_error_status() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = test_support::spawn(
            StatusCode::BAD_REQUEST,
            r#"{"file":"a.txt","error":"Input file not in CSV format."}"#,
            None,
        )
        .await;
        let state = AppState::for_tests(tmp.path(), fake.addr, 5000);
        std::fs::write(tmp.path().join("a.txt"), "garbage").unwrap();

        let (status, body) = call(
            &state,
            Method::POST,
            "/calculate",
            json!({"file": "a.txt", "product": "wheat"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"file": "a.txt", "error": "Input file not in CSV format."})
        );
    }

    #[tokio::test]
    async fn test_calculate_downstream_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = test_support::spawn(StatusCode::OK, "{}", Some(Duration::from_secs(2))).await;
        let state = AppState::for_tests(tmp.path(), fake.addr, 100);
        std::fs::write(tmp.path().join("a.txt"), "x").unwrap();

        let (status, body) = call(
            &state,
            Method::POST,
            "/calculate",
            json!({"file": "a.txt", "product": "wheat"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"file": "a.txt", "error": "Error communicating with calculation service."})
        );
    }

    #[tokio::test]
    async fn test_calculate_downstream_unreachable() {
        let (tmp, state) = state_without_calculator().await;
        std::fs::write(tmp.path().join("a.txt"), "x").unwrap();

        let (status, body) = call(
            &state,
            Method::POST,
            "/calculate",
            json!({"file": "a.txt", "product": 3}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"file": "a.txt", "error": "Error communicating with calculation service."})
        );
    }

    #[tokio::test]
    async fn test_store_then_calculate() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = test_support::spawn(StatusCode::OK, r#"{"file":"b.csv","sum":7}"#, None).await;
        let state = AppState::for_tests(tmp.path(), fake.addr, 5000);

        let (status, _) = call(
            &state,
            Method::POST,
            "/store-file",
            json!({"file": "b.csv", "data": "product, amount\nx, 7"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &state,
            Method::POST,
            "/calculate",
            json!({"file": "b.csv", "product": "x"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"file": "b.csv", "sum": 7}));
    }

    #[tokio::test]
    async fn test_unknown_route_and_wrong_method() {
        let (_tmp, state) = state_without_calculator().await;

        let (status, body) = call(&state, Method::GET, "/nope", Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not Found"}));

        let resp = dispatch(&Method::GET, "/store-file", b"", &state).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["allow"], "POST");

        let resp = dispatch(&Method::DELETE, "/start", b"", &state).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (tmp, state) = state_without_calculator().await;

        let (status, body) = call(&state, Method::GET, "/healthz", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));

        let (status, _) = call(&state, Method::GET, "/readyz", Value::Null).await;
        assert_eq!(status, StatusCode::OK);

        std::fs::remove_dir_all(tmp.path()).unwrap();
        let (status, body) = call(&state, Method::GET, "/readyz", Value::Null).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"status": "unavailable"}));
    }
}
