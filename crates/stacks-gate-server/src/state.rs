use stacks_gate::{GateError, StacksApiClient};

use crate::config::ServerConfig;
use crate::generator::HttpGenerator;

/// Shared application state. The ledger and generator are injected so the
/// routes can run against any implementation.
pub struct AppState<L, G> {
    pub config: ServerConfig,
    pub ledger: L,
    pub generator: G,
}

impl<L, G> AppState<L, G> {
    pub fn new(config: ServerConfig, ledger: L, generator: G) -> Self {
        Self {
            config,
            ledger,
            generator,
        }
    }
}

impl AppState<StacksApiClient, HttpGenerator> {
    /// Production state: Stacks API ledger and HTTP generator sharing the
    /// configured upstream timeout.
    pub fn from_config(config: ServerConfig) -> Result<Self, GateError> {
        let ledger = StacksApiClient::new(config.upstream_timeout)?;
        let generator = HttpGenerator::new(config.generator_url.clone(), config.upstream_timeout)?;
        Ok(Self::new(config, ledger, generator))
    }
}
