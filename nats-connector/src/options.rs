//! Resolved connection parameters
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


use natsbridge_config::NatsConfig;
use std::fmt;

/// Values set through the connector's setters. `None` falls back to configuration.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub server: Option<String>,
    pub port: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

/// Parameters a connection is created with. Fixed for the connection's lifetime.
///
/// Credentials are sent as a user/password pair: a user without a password
/// authenticates with an empty password, a password without a user is not sent.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: String,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub name: Option<String>,
}

impl ConnectOptions {
    /// Resolve parameters: explicit override first, then configuration
    pub(crate) fn resolve(overrides: &Overrides, config: &NatsConfig) -> Self {
        Self {
            host: overrides.server.clone().unwrap_or_else(|| config.host.clone()),
            port: overrides.port.clone().unwrap_or_else(|| config.port.clone()),
            user: overrides.user.clone().or_else(|| config.user.clone()),
            pass: overrides.pass.clone().or_else(|| config.pass.clone()),
            name: config.name.clone(),
        }
    }

    /// User/password pair to authenticate with, if a user is set
    pub fn credentials(&self) -> Option<(String, String)> {
        self.user
            .clone()
            .map(|user| (user, self.pass.clone().unwrap_or_default()))
    }

    /// Server URL the client dials
    pub fn url(&self) -> String {
        format!("nats://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "***"))
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_config() {
        let options = ConnectOptions::resolve(&Overrides::default(), &NatsConfig::default());
        assert_eq!(options.url(), "nats://127.0.0.1:4222");
        assert!(options.user.is_none());
        assert!(options.pass.is_none());
    }

    #[test]
    fn test_overrides_win() {
        let config = NatsConfig {
            host: "from-env".to_string(),
            port: "5000".to_string(),
            user: Some("env-user".to_string()),
            pass: Some("env-pass".to_string()),
            ..NatsConfig::enabled()
        };
        let overrides = Overrides {
            server: Some("explicit".to_string()),
            port: None,
            user: Some("explicit-user".to_string()),
            pass: None,
        };

        let options = ConnectOptions::resolve(&overrides, &config);
        assert_eq!(options.host, "explicit");
        assert_eq!(options.port, "5000");
        assert_eq!(options.user.as_deref(), Some("explicit-user"));
        assert_eq!(options.pass.as_deref(), Some("env-pass"));
    }

    #[test]
    fn test_credentials_pairing() {
        let mut options = ConnectOptions::resolve(&Overrides::default(), &NatsConfig::default());
        assert_eq!(options.credentials(), None);

        options.user = Some("svc".to_string());
        assert_eq!(options.credentials(), Some(("svc".to_string(), String::new())));

        options.pass = Some("s3cret".to_string());
        assert_eq!(options.credentials(), Some(("svc".to_string(), "s3cret".to_string())));

        options.user = None;
        assert_eq!(options.credentials(), None);
    }

    #[test]
    fn test_debug_hides_password() {
        let options = ConnectOptions {
            host: "h".to_string(),
            port: "1".to_string(),
            user: Some("u".to_string()),
            pass: Some("hunter2".to_string()),
            name: None,
        };
        let rendered = format!("{:?}", options);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
