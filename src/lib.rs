pub mod blocking;
mod client;
mod config;
mod diff;
mod domain;
mod error;
mod logger;
pub mod protocol;
mod types;
pub mod xml;

pub use client::{NO_PRESET, PlugwiseClient, PlugwiseClientBuilder};
pub use config::ConnectionConfig;
pub use domain::{
    DomainObject, DomainObjects, Measurement, Module, PointLog, Rule, RuleAction, Service,
};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use types::*;
