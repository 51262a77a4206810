//! Application state

use pxy_core::CacheTransport;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound of the random delay applied to a failed flush authentication
pub const DEFAULT_AUTH_FAILURE_DELAY: Duration = Duration::from_millis(3000);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<CacheTransport>,
    pub auth_failure_delay: Duration,
}

impl AppState {
    pub fn new(transport: Arc<CacheTransport>) -> Self {
        Self {
            transport,
            auth_failure_delay: DEFAULT_AUTH_FAILURE_DELAY,
        }
    }

    pub fn with_auth_failure_delay(mut self, delay: Duration) -> Self {
        self.auth_failure_delay = delay;
        self
    }
}
