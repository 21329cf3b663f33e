//! Runtime configuration
//!
//! Endpoints and tuning knobs for the transport and command clients. Defaults
//! match the local development backend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL for command submission (`/simulate_donation`, `/simulate_walker`, `/health`)
    pub api_base_url: String,
    /// Server-push channel endpoint
    pub ws_url: String,
    /// Per-request timeout for command submission, milliseconds
    pub request_timeout_ms: u32,
    /// Command submission retry ceiling
    pub max_retries: u32,
    /// Base delay between command retries; grows linearly with the attempt number
    pub retry_delay_ms: f64,
    /// Seed for the registry RNG; randomized at startup, fixed in tests
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_string(),
            ws_url: "ws://127.0.0.1:8080/ws".to_string(),
            request_timeout_ms: 5000,
            max_retries: 3,
            retry_delay_ms: 1000.0,
            seed: 0,
        }
    }
}

impl Config {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}
