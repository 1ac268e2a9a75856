//! `/start` endpoint

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::payload::Payload;
use crate::error::{ServiceError, ServiceResult};
use crate::http;

#[derive(Serialize)]
struct EchoReply<'a> {
    banner: &'a Value,
    ip: &'a Value,
}

/// GET: service is up
pub fn status() -> Response<Full<Bytes>> {
    http::json_response(
        StatusCode::OK,
        &serde_json::json!({"message": "Service is running"}),
    )
}

/// POST: echo `banner` and `ip` back, whatever their types
pub fn echo(payload: Option<&Payload>) -> ServiceResult<Response<Full<Bytes>>> {
    let payload = payload.ok_or(ServiceError::InvalidInput)?;
    let (Some(banner), Some(ip)) = (payload.get("banner"), payload.get("ip")) else {
        return Err(ServiceError::InvalidInput);
    };

    Ok(http::json_response(StatusCode::OK, &EchoReply { banner, ip }))
}
