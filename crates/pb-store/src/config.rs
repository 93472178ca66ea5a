//! Runtime knobs for a [`BoardStore`](crate::BoardStore).

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Upper bound on a single gateway call. A call that takes longer is
    /// abandoned and reported as `AppError::Timeout`.
    #[serde(default = "default_timeout", with = "secs")]
    pub gateway_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl StoreConfig {
    pub fn with_timeout(gateway_timeout: Duration) -> Self {
        Self { gateway_timeout }
    }
}

fn default_timeout() -> Duration {
    DEFAULT_GATEWAY_TIMEOUT
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
