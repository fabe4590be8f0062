use std::time::Duration;

use serde::Deserialize;

use crate::protocol::{DEFAULT_PORT, DEFAULT_TIMEOUT, DEFAULT_USERNAME};

/// Connection settings as a host application stores them.
///
/// Only `host` and `password` are required; the Smile ID printed on the
/// device doubles as the password.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub password: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
    #[serde(default)]
    pub legacy: bool,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            password: password.into(),
            username: default_username(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT.as_secs(),
            legacy: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
