//! Request handler module
//!
//! Routing plus the three endpoint handlers: echo, file store and the
//! calculation proxy.

mod calculate;
mod echo;
mod payload;
pub mod router;
mod store;

// Re-export main entry point
pub use router::handle_request;
