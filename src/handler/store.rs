//! `/store-file` endpoint

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::payload::{require_file_and, Payload};
use crate::config::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::http;
use crate::storage::StoreError;

#[derive(Serialize)]
struct StoreReply<'a> {
    file: &'a str,
    message: &'static str,
}

/// Map a store failure for `file` onto the service taxonomy
pub fn store_error(file: &str, source: StoreError) -> ServiceError {
    match source {
        StoreError::InvalidName(_) => ServiceError::InvalidFileName {
            file: file.to_string(),
        },
        source => ServiceError::Storage {
            file: file.to_string(),
            source,
        },
    }
}

/// Write `data` as the full contents of `file`, overwriting
pub async fn store_file(
    state: &AppState,
    payload: Option<&Payload>,
) -> ServiceResult<Response<Full<Bytes>>> {
    let (file, data) = require_file_and(payload, "data")?;
    state.store.resolve(file).map_err(|e| store_error(file, e))?;

    // Checked before the write so a bad value leaves no file behind
    let content = data
        .as_str()
        .ok_or_else(|| store_error(file, StoreError::NotText))?;

    state
        .store
        .write(file, content)
        .await
        .map_err(|e| store_error(file, e))?;

    Ok(http::json_response(
        StatusCode::OK,
        &StoreReply {
            file,
            message: "Success.",
        },
    ))
}
