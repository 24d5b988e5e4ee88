use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Transport configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetConfig {
    /// Plain-text, whitespace-delimited peer address list.
    pub peer_file: PathBuf,
    /// Port used for peer entries that carry no port of their own.
    pub port: u16,
    /// Connection attempts per peer before init fails.
    pub connect_attempts: u32,
    /// Delay between connection attempts, in milliseconds.
    pub connect_backoff_ms: u64,
}

impl NetConfig {
    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            peer_file: PathBuf::from("peers.txt"),
            port: 10_000,
            connect_attempts: 30,
            connect_backoff_ms: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = NetConfig::default();
        assert_eq!(c.port, 10_000);
        assert_eq!(c.connect_attempts, 30);
        assert_eq!(c.connect_backoff(), Duration::from_millis(200));
    }
}
