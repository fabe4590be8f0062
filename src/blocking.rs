//! Synchronous wrapper around [`crate::PlugwiseClient`].
//!
//! Owns a current-thread runtime and drives every call on it. Do not use from
//! inside another async runtime.

use tokio::runtime::{Builder, Runtime};

use crate::domain::DomainObjects;
use crate::types::{ConnectionState, ThermostatReading};
use crate::xml::Element;
use crate::Result;

pub struct PlugwiseClient {
    inner: crate::PlugwiseClient,
    runtime: Runtime,
}

impl PlugwiseClient {
    pub fn new(inner: crate::PlugwiseClient) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    pub fn connect(&mut self) -> bool {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn request(&mut self, command: &str) -> Result<Option<Element>> {
        self.runtime.block_on(self.inner.request(command))
    }

    pub fn request_with_retries(&mut self, command: &str, retries: u32) -> Result<Option<Element>> {
        self.runtime
            .block_on(self.inner.request_with_retries(command, retries))
    }

    pub fn update_domain_objects(&mut self) -> Result<bool> {
        self.runtime.block_on(self.inner.update_domain_objects())
    }

    pub fn update_device(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.update_device())
    }

    pub fn find_all_appliances(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.find_all_appliances())
    }

    pub fn close_connection(&mut self) {
        self.inner.close_connection();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn domain_objects(&self) -> Option<&DomainObjects> {
        self.inner.domain_objects()
    }

    pub fn current_preset(&self) -> Result<Option<String>> {
        self.inner.current_preset()
    }

    pub fn schedule_temperature(&self) -> Result<Option<f64>> {
        self.inner.schedule_temperature()
    }

    pub fn current_temperature(&self) -> Result<Option<f64>> {
        self.inner.current_temperature()
    }

    pub fn reading(&self) -> Result<ThermostatReading> {
        self.inner.reading()
    }

    pub fn into_inner(self) -> crate::PlugwiseClient {
        self.inner
    }
}
