//! HTTP protocol layer module
//!
//! Response builders, decoupled from the endpoint handlers.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_404_response, build_405_response, build_413_response, error_response, json_response,
    passthrough_response,
};
