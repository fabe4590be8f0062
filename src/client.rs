use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use crate::config::ConnectionConfig;
use crate::diff::diff_snapshots;
use crate::domain::DomainObjects;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    DEFAULT_PORT, DEFAULT_TIMEOUT, DEFAULT_USERNAME, DOMAIN_OBJECTS_ENDPOINT,
    MIN_TIME_BETWEEN_UPDATES, PING_ENDPOINT, escape_illegal_xml_characters, is_no_data_payload,
    is_ping_response,
};
use crate::types::*;
use crate::xml::{self, Element};
use crate::{Error, Result};

/// Preset reported by a legacy Anna when no rule is active.
pub const NO_PRESET: &str = "none";

const SCHEDULE_TEMPERATURE_LOG: &str = "schedule_temperature";
const TEMPERATURE_LOG: &str = "temperature";

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&DomainObjects) + Send + Sync>;

/// Rate limiter for snapshot refreshes. Bounds the request rate only;
/// serializing refreshes is left to `&mut self`.
struct Throttle {
    interval: Duration,
    last_run: Option<Instant>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_run
            && now.duration_since(last) < self.interval
        {
            return false;
        }
        self.last_run = Some(now);
        true
    }
}

pub struct PlugwiseClientBuilder {
    host: String,
    password: String,
    username: String,
    port: u16,
    timeout: Duration,
    legacy: bool,
    connect_retry: RetryPolicy,
    request_retry: RetryPolicy,
    throttle_interval: Duration,
    missing_data: MissingDataPolicy,
    retain_stale_snapshot: bool,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl PlugwiseClientBuilder {
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            password: password.into(),
            username: DEFAULT_USERNAME.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            legacy: false,
            connect_retry: RetryPolicy::default_connect(),
            request_retry: RetryPolicy::default_request(),
            throttle_interval: MIN_TIME_BETWEEN_UPDATES,
            missing_data: MissingDataPolicy::default(),
            retain_stale_snapshot: true,
            event_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.host.clone(), config.password.clone())
            .username(config.username.clone())
            .port(config.port)
            .timeout(config.timeout())
            .legacy(config.legacy)
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Legacy Annas report the preset through their active rule.
    pub fn legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn connect_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.connect_retry = policy;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.request_retry = policy;
        self
    }

    pub fn throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }

    pub fn missing_data_policy(mut self, policy: MissingDataPolicy) -> Self {
        self.missing_data = policy;
        self
    }

    /// Keep the last good snapshot when a refresh brings no data (default),
    /// or clear it.
    pub fn retain_stale_snapshot(mut self, retain: bool) -> Self {
        self.retain_stale_snapshot = retain;
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&DomainObjects) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<PlugwiseClient> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        Ok(PlugwiseClient {
            http: Some(http),
            endpoint: format!("http://{}:{}", self.host, self.port),
            username: self.username,
            password: self.password,
            legacy: self.legacy,
            connect_retry: self.connect_retry,
            request_retry: self.request_retry,
            missing_data: self.missing_data,
            retain_stale_snapshot: self.retain_stale_snapshot,
            state: ConnectionState::Disconnected,
            throttle: Throttle::new(self.throttle_interval),
            domain_objects: None,
            event_callbacks: self.event_callbacks,
            snapshot_callbacks: self.snapshot_callbacks,
            logger,
        })
    }

    pub fn build_blocking(self) -> Result<crate::blocking::PlugwiseClient> {
        crate::blocking::PlugwiseClient::new(self.build()?)
    }
}

/// Client for one Smile. Not meant for overlapping calls: refreshes must be
/// serialized by the caller, which `&mut self` enforces.
pub struct PlugwiseClient {
    http: Option<reqwest::Client>,
    endpoint: String,
    username: String,
    password: String,
    legacy: bool,
    connect_retry: RetryPolicy,
    request_retry: RetryPolicy,
    missing_data: MissingDataPolicy,
    retain_stale_snapshot: bool,
    state: ConnectionState,
    throttle: Throttle,
    domain_objects: Option<DomainObjects>,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    logger: Option<MessageLogger>,
}

impl PlugwiseClient {
    pub fn builder(host: impl Into<String>, password: impl Into<String>) -> PlugwiseClientBuilder {
        PlugwiseClientBuilder::new(host, password)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Last snapshot fetched, however old.
    pub fn domain_objects(&self) -> Option<&DomainObjects> {
        self.domain_objects.as_ref()
    }

    pub async fn connect(&mut self) -> bool {
        self.connect_with_retries(self.connect_retry.retries).await
    }

    /// Ping the Smile. Every transport error is retried; the outcome is only
    /// ever reported as `true`/`false`.
    pub async fn connect_with_retries(&mut self, retries: u32) -> bool {
        let Ok(http) = self.session() else {
            error!("cannot connect to Plugwise: connection already closed");
            return false;
        };

        debug!(endpoint = %self.endpoint, "connecting to Plugwise");
        let policy = RetryPolicy {
            retries,
            ..self.connect_retry
        };
        let body = match self.get_text(&http, PING_ENDPOINT, policy, |_| true).await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "error connecting to Plugwise");
                self.state = ConnectionState::Disconnected;
                return false;
            }
        };

        if !is_ping_response(&body) {
            error!(body = %body, "connected but expected text not returned");
            self.state = ConnectionState::Disconnected;
            return false;
        }

        self.state = ConnectionState::Connected;
        true
    }

    pub async fn request(&mut self, command: &str) -> Result<Option<Element>> {
        self.request_with_retries(command, self.request_retry.retries).await
    }

    /// GET `command` and parse the answer.
    ///
    /// Timeouts are retried; other transport errors give up at once. Both end
    /// as `Ok(None)`, as do the empty and `{"errorCode":0}` payloads. Markup
    /// that is still malformed after ampersand escaping is an `Err`.
    pub async fn request_with_retries(
        &mut self,
        command: &str,
        retries: u32,
    ) -> Result<Option<Element>> {
        let http = self.session()?;
        debug!(command, "Plugwise command");

        let policy = RetryPolicy {
            retries,
            ..self.request_retry
        };
        let body = match self
            .get_text(&http, command, policy, reqwest::Error::is_timeout)
            .await
        {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                error!(command, "timed out sending command to Plugwise");
                return Ok(None);
            }
            Err(e) => {
                error!(command, error = %e, "error sending command to Plugwise");
                return Ok(None);
            }
        };

        if is_no_data_payload(&body) {
            trace!(command, "no data");
            return Ok(None);
        }

        xml::parse(&escape_illegal_xml_characters(&body)).map(Some)
    }

    /// Drop the HTTP session. The client cannot be used afterwards.
    pub fn close_connection(&mut self) {
        if self.http.take().is_some() {
            debug!(endpoint = %self.endpoint, "closing Plugwise connection");
        }
        self.state = ConnectionState::Closed;
    }

    /// Fetch `/core/domain_objects` now. Returns whether a new snapshot was
    /// installed.
    pub async fn update_domain_objects(&mut self) -> Result<bool> {
        match self.request(DOMAIN_OBJECTS_ENDPOINT).await? {
            Some(root) => {
                self.install_snapshot(DomainObjects::from_element(&root));
                Ok(true)
            }
            None => {
                if !self.retain_stale_snapshot {
                    self.domain_objects = None;
                }
                Ok(false)
            }
        }
    }

    /// Like [`update_domain_objects`](Self::update_domain_objects), but at most
    /// once per throttle interval. Skipped calls return `Ok(false)`.
    pub async fn throttle_update_domain_objects(&mut self) -> Result<bool> {
        if !self.throttle.try_acquire() {
            trace!("domain objects refresh throttled");
            return Ok(false);
        }
        self.update_domain_objects().await
    }

    /// Periodic poll entry point.
    pub async fn update_device(&mut self) -> Result<()> {
        self.throttle_update_domain_objects().await?;
        Ok(())
    }

    /// Discovery entry point; always fetches.
    pub async fn find_all_appliances(&mut self) -> Result<()> {
        self.update_domain_objects().await?;
        Ok(())
    }

    pub fn current_preset(&self) -> Result<Option<String>> {
        let Some(snapshot) = self.snapshot()? else {
            return Ok(None);
        };

        if self.legacy {
            let icon = snapshot.active_rule_icon().unwrap_or(NO_PRESET);
            return Ok(Some(icon.to_string()));
        }

        match snapshot.thermostat_preset_measurement() {
            Some(measurement) => Ok(measurement.value.clone()),
            None => self.missing(Error::MissingData(
                "thermostat preset_state measurement".to_string(),
            )),
        }
    }

    /// Target temperature of the running schedule.
    pub fn schedule_temperature(&self) -> Result<Option<f64>> {
        let Some(snapshot) = self.snapshot()? else {
            return Ok(None);
        };
        let Some(id) = snapshot.point_log_id(SCHEDULE_TEMPERATURE_LOG) else {
            return Ok(None);
        };
        match snapshot.measurement(id) {
            Some(value) => self.coerce(id, value),
            None => Ok(None),
        }
    }

    /// Room temperature measured by the thermostat.
    pub fn current_temperature(&self) -> Result<Option<f64>> {
        let Some(snapshot) = self.snapshot()? else {
            return Ok(None);
        };
        let Some(id) = snapshot.point_log_id(TEMPERATURE_LOG) else {
            return Ok(None);
        };
        match snapshot.measurement(id) {
            Some(value) => self.coerce(id, value),
            None => self.missing(Error::MissingData(format!("measurement of point log {id}"))),
        }
    }

    pub fn reading(&self) -> Result<ThermostatReading> {
        Ok(ThermostatReading {
            current_temperature: self.current_temperature()?,
            target_temperature: self.schedule_temperature()?,
            preset: self.current_preset()?,
        })
    }

    // -- Helpers --

    fn session(&self) -> Result<reqwest::Client> {
        self.http.clone().ok_or(Error::Closed)
    }

    async fn get_text(
        &mut self,
        http: &reqwest::Client,
        path: &str,
        policy: RetryPolicy,
        retryable: fn(&reqwest::Error) -> bool,
    ) -> std::result::Result<String, reqwest::Error> {
        let url = format!("{}{}", self.endpoint, path);
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(ref mut logger) = self.logger {
                logger.log_request("GET", path, attempt);
            }

            let result = match http
                .get(&url)
                .basic_auth(&self.username, Some(&self.password))
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    resp.text().await.map(|body| (status, body))
                }
                Err(e) => Err(e),
            };

            match result {
                Ok((status, body)) => {
                    if let Some(ref mut logger) = self.logger {
                        logger.log_response(path, status, &body);
                    }
                    return Ok(body);
                }
                Err(e) => {
                    if let Some(ref mut logger) = self.logger {
                        logger.log_failure(path, &e.to_string());
                    }
                    if attempt >= policy.attempts() || !retryable(&e) {
                        return Err(e);
                    }
                    debug!(path, attempt, error = %e, "retrying");
                    if !policy.delay.is_zero() {
                        tokio::time::sleep(policy.delay).await;
                    }
                }
            }
        }
    }

    fn install_snapshot(&mut self, snapshot: DomainObjects) {
        if !self.event_callbacks.is_empty() {
            let events = diff_snapshots(self.domain_objects.as_ref(), &snapshot);
            for event in &events {
                for cb in &self.event_callbacks {
                    cb(event);
                }
            }
            if !events.is_empty() {
                debug!(count = events.len(), "domain objects changed");
            }
        }

        if let Some(ref mut logger) = self.logger {
            logger.log_snapshot(&snapshot);
        }

        for cb in &self.snapshot_callbacks {
            cb(&snapshot);
        }

        self.domain_objects = Some(snapshot);
    }

    fn snapshot(&self) -> Result<Option<&DomainObjects>> {
        match self.domain_objects {
            Some(ref snapshot) => Ok(Some(snapshot)),
            None => self.missing(Error::NoSnapshot),
        }
    }

    fn missing<T>(&self, err: Error) -> Result<Option<T>> {
        match self.missing_data {
            MissingDataPolicy::Strict => Err(err),
            MissingDataPolicy::Lenient => {
                warn!("{err}");
                Ok(None)
            }
        }
    }

    fn coerce(&self, point_log_id: &str, value: &str) -> Result<Option<f64>> {
        match value.trim().parse::<f64>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => self.missing(Error::InvalidMeasurement {
                point_log_id: point_log_id.to_string(),
                value: value.to_string(),
            }),
        }
    }
}
