//! Configuration management for NatsBridge
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use config::{Config, Environment, Map};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default broker host
pub const NATS_DEFAULT_SERVER: &str = "127.0.0.1";

/// Default broker port
pub const NATS_DEFAULT_PORT: &str = "4222";

/// Environment variable prefix for broker settings (`NATS_HOST`, `NATS_PORT`, ...)
pub const ENV_PREFIX: &str = "NATS";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Broker connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NatsConfig {
    /// Messaging feature flag; when false every operation fails with no connection
    #[serde(default)]
    pub enabled: bool,

    pub host: String,

    pub port: String,

    pub user: Option<String>,

    pub pass: Option<String>,

    /// Request timeout in milliseconds; unset means wait for the reply indefinitely
    pub request_timeout_ms: Option<u64>,

    /// Connection name reported to the broker
    pub name: Option<String>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: NATS_DEFAULT_SERVER.to_string(),
            port: NATS_DEFAULT_PORT.to_string(),
            user: None,
            pass: None,
            request_timeout_ms: None,
            name: None,
        }
    }
}

impl NatsConfig {
    /// Load broker settings from `NATS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load broker settings from an explicit variable map instead of the
    /// process environment. Keys use the same `NATS_*` names.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<Map<String, String>>) -> Result<Self> {
        let config = Config::builder()
            .set_default("enabled", false)?
            .set_default("host", NATS_DEFAULT_SERVER)?
            .set_default("port", NATS_DEFAULT_PORT)?
            .add_source(Environment::with_prefix(ENV_PREFIX).source(vars))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Configuration with messaging switched on and everything else defaulted
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Request timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let nats = NatsConfig::from_env()?;
        let log_level = env::var("LOG_LEVEL").ok();

        Ok(Self { nats, log_level })
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}
