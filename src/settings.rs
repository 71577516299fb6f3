use crate::api::Address;
use crate::pool::PoolConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::str::FromStr;

/// Server settings. Defaults, then the config file, then `SPORTSPOOL_*`
/// environment variables, then command line overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub port: u16,
    pub db: Option<String>,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub test: bool,
    pub min_wager: u64,
    pub max_wager: u64,
    pub resolve_delay_secs: i64,
    pub request_timeout_secs: i64,
    pub upkeep_interval_secs: u64,
    pub destination_selector: u64,
    pub destination_receiver: Option<String>,
    pub sports_api_key: Option<String>,
    /// Single host for every sport instead of the public api-sports hosts.
    pub sports_api_url: Option<String>,
    pub bridge_url: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<u16>,
    pub db: Option<String>,
    pub admins: Vec<String>,
    pub test: bool,
}

impl Settings {
    pub fn load(path: &str, overrides: Overrides) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("port", 8081)?
            .set_default("min_wager", 10_000_000_000_000u64)?
            .set_default("max_wager", 10_000_000_000_000_000u64)?
            .set_default("resolve_delay_secs", 7200)?
            .set_default("request_timeout_secs", 300)?
            .set_default("upkeep_interval_secs", 60)?
            .set_default("destination_selector", 0)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SPORTSPOOL")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("admins"),
            );
        if let Some(port) = overrides.port {
            builder = builder.set_override("port", i64::from(port))?;
        }
        if let Some(db) = overrides.db {
            builder = builder.set_override("db", db)?;
        }
        if !overrides.admins.is_empty() {
            builder = builder.set_override("admins", overrides.admins)?;
        }
        if overrides.test {
            builder = builder.set_override("test", true)?;
        }
        builder
            .build()?
            .try_deserialize()
            .with_context(|| format!("invalid settings in {}", path))
    }
    pub fn pool_config(&self) -> Result<PoolConfig> {
        let destination_receiver = match &self.destination_receiver {
            Some(receiver) => Some(
                Address::from_str(receiver.as_str())
                    .context("invalid destination_receiver")?,
            ),
            None => None,
        };
        Ok(PoolConfig {
            min_wager: self.min_wager.into(),
            max_wager: self.max_wager.into(),
            resolve_delay: chrono::Duration::seconds(self.resolve_delay_secs),
            request_timeout: chrono::Duration::seconds(self.request_timeout_secs),
            destination_selector: self.destination_selector,
            destination_receiver,
        })
    }
}
