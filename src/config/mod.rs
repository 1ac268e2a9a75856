// Configuration module entry point
// Loads layered configuration and builds the shared application state

mod state;
mod types;

use hyper::Uri;
use std::net::SocketAddr;
use std::time::Duration;

pub use state::AppState;
pub use types::{CalculatorConfig, Config};

/// Path on the calculation service that receives forwarded requests
const CALCULATE_PRODUCT_PATH: &str = "/calculate-product";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.request_timeout", 30)?
            .set_default("performance.shutdown_grace", 10)?
            .set_default("http.server_name", "calc-gateway/0.1")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("storage.dir", "/pv_dir")?
            .set_default("calculator.host", "microservice2")?
            .set_default("calculator.port", 5000)?
            .set_default("calculator.timeout_ms", 5000)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

impl CalculatorConfig {
    /// Full URI of the downstream `/calculate-product` endpoint
    pub fn endpoint(&self) -> Result<Uri, String> {
        format!("http://{}:{}{CALCULATE_PRODUCT_PATH}", self.host, self.port)
            .parse()
            .map_err(|e| format!("Invalid calculator address: {e}"))
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
