use std::time::Duration;

use crate::protocol::{DEFAULT_CONNECT_RETRIES, DEFAULT_REQUEST_RETRIES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Closed,
}

/// What the getters do when a value they cannot do without is absent.
///
/// `Strict` reports an error: a missing non-legacy preset, a missing
/// temperature measurement behind a known point log, an unparsable
/// measurement, or a query before the first fetch. `Lenient` logs a warning
/// and reports `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingDataPolicy {
    #[default]
    Strict,
    Lenient,
}

/// Bounded retry: `retries` extra attempts after the first, `delay` between
/// attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub(crate) fn default_connect() -> Self {
        Self::new(DEFAULT_CONNECT_RETRIES)
    }

    pub(crate) fn default_request() -> Self {
        Self::new(DEFAULT_REQUEST_RETRIES)
    }
}

/// The values a climate entity shows. Temperatures are Celsius.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThermostatReading {
    pub current_temperature: Option<f64>,
    pub target_temperature: Option<f64>,
    pub preset: Option<String>,
}

/// Emitted by the diff engine when a fresh snapshot differs from the last one.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MeasurementChanged {
        point_log_id: String,
        log_type: Option<String>,
        old: Option<String>,
        new: Option<String>,
    },
    ActiveRulesChanged {
        active: Vec<String>,
    },
}
