// Application state module
// Built once at startup and shared read-only by every connection

use super::types::Config;
use crate::downstream::CalculatorClient;
use crate::storage::FileStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: FileStore,
    pub calculator: CalculatorClient,
}

impl AppState {
    /// Create `AppState`, preparing the storage directory and the downstream client
    pub fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let store = FileStore::open(&config.storage.dir)?;
        let endpoint = config.calculator.endpoint()?;
        let calculator = CalculatorClient::new(endpoint, config.calculator.timeout());

        Ok(Self {
            config: config.clone(),
            store,
            calculator,
        })
    }

    /// Default config pointed at a scratch directory and a local calculator
    #[cfg(test)]
    pub fn test_config(
        storage_dir: &std::path::Path,
        calculator: std::net::SocketAddr,
        timeout_ms: u64,
    ) -> Config {
        let mut config = Config::load_from("does-not-exist/config").unwrap();
        config.storage.dir = storage_dir.to_string_lossy().into_owned();
        config.calculator.host = calculator.ip().to_string();
        config.calculator.port = calculator.port();
        config.calculator.timeout_ms = timeout_ms;
        config.logging.access_log = false;
        config
    }

    #[cfg(test)]
    pub fn for_tests(
        storage_dir: &std::path::Path,
        calculator: std::net::SocketAddr,
        timeout_ms: u64,
    ) -> Self {
        Self::new(&Self::test_config(storage_dir, calculator, timeout_ms)).unwrap()
    }
}
