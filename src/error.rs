//! Service error type
//!
//! Every handler returns `Result<_, ServiceError>`; the router turns the error
//! into a JSON body with the matching status code.

use hyper::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::downstream::DownstreamError;
use crate::storage::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing fields on an endpoint that does not echo a file name
    #[error("Invalid JSON input.")]
    InvalidInput,

    /// Missing fields; `file` is echoed back (null when absent or empty)
    #[error("Invalid JSON input.")]
    InvalidFileInput { file: Value },

    #[error("Invalid file name.")]
    InvalidFileName { file: String },

    #[error("File not found.")]
    FileNotFound { file: String },

    #[error("Error while storing the file to the storage.")]
    Storage {
        file: String,
        #[source]
        source: StoreError,
    },

    #[error("Error communicating with calculation service.")]
    Downstream {
        file: String,
        #[source]
        source: DownstreamError,
    },
}

/// JSON error body, `file` omitted only for `InvalidInput`
#[derive(Serialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<Value>,
    pub error: String,
}

impl ServiceError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::InvalidFileInput { .. } | Self::InvalidFileName { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::FileNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Storage { .. } | Self::Downstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Internal cause, for the server-side log only
    pub fn internal_cause(&self) -> Option<String> {
        match self {
            Self::Storage { file, source } => Some(format!("Error storing file {file:?}: {source}")),
            Self::Downstream { file, source } => Some(format!(
                "Error communicating with calculation service for {file:?}: {source}"
            )),
            _ => None,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let file = match self {
            Self::InvalidInput => None,
            Self::InvalidFileInput { file } => Some(file.clone()),
            Self::InvalidFileName { file }
            | Self::FileNotFound { file }
            | Self::Storage { file, .. }
            | Self::Downstream { file, .. } => Some(Value::String(file.clone())),
        };

        ErrorBody {
            file,
            error: self.to_string(),
        }
    }
}
