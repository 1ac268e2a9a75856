//! `/calculate` endpoint

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use super::payload::{require_file_and, Payload};
use super::store::store_error;
use crate::config::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::http;
use crate::logger;

/// Forward a stored file's name and `product` to the calculation service
pub async fn calculate(
    state: &AppState,
    payload: Option<&Payload>,
) -> ServiceResult<Response<Full<Bytes>>> {
    let (file, product) = require_file_and(payload, "product")?;

    let exists = state
        .store
        .exists(file)
        .await
        .map_err(|e| store_error(file, e))?;
    if !exists {
        return Err(ServiceError::FileNotFound {
            file: file.to_string(),
        });
    }

    let reply = state
        .calculator
        .calculate(file, product)
        .await
        .map_err(|source| ServiceError::Downstream {
            file: file.to_string(),
            source,
        })?;

    logger::log_debug(&format!(
        "Calculation service answered {} for {file:?}",
        reply.status
    ));
    Ok(http::passthrough_response(reply))
}
