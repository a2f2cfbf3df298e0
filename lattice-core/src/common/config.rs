/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::PathBuf;
use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

lazy_static! {
    /// Process-wide configuration, loaded once on first use.
    pub(crate) static ref CONFIG: LatticeConfig = LatticeConfig::load();
}

/// Configuration for the Lattice framework.
///
/// All values are optional: the configuration is loaded from a TOML file in
/// an XDG-compliant directory and every missing field falls back to its
/// default.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LatticeConfig {
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
    /// Limits and rate configuration.
    pub limits: LimitsConfig,
    /// Default values configuration.
    pub defaults: DefaultsConfig,
    /// Path configuration for state and configuration files.
    pub paths: PathsConfig,
}

/// Timeout-related configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default deadline for `send_blocking` calls, in milliseconds.
    pub send_blocking_timeout_ms: u64,
    /// How long a stop waits for a service's tasks to finish.
    pub shutdown_timeout_ms: u64,
}

/// Limits and rate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Window within which identical status broadcasts from one service
    /// are suppressed, in milliseconds.
    pub status_broadcast_limit_ms: u64,
}

/// Default values configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Process id for the node; empty means derive one from the OS pid.
    pub process_id: String,
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for persisted service state; empty means the XDG data dir.
    pub data_directory: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            send_blocking_timeout_ms: 1_000,
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            status_broadcast_limit_ms: 1_000,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            process_id: String::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_directory: String::new(),
        }
    }
}

impl LatticeConfig {
    /// Loads `config.toml` from the XDG config directory for the `lattice`
    /// prefix, falling back to defaults when absent or malformed.
    pub fn load() -> Self {
        let Ok(dirs) = xdg::BaseDirectories::with_prefix("lattice") else {
            debug!("no XDG base directories, using default configuration");
            return LatticeConfig::default();
        };
        let Some(path) = dirs.find_config_file("config.toml") else {
            debug!("no config.toml found, using default configuration");
            return LatticeConfig::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "malformed configuration, using defaults");
                    LatticeConfig::default()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unreadable configuration, using defaults");
                LatticeConfig::default()
            }
        }
    }

    pub(crate) fn process_id(&self) -> String {
        if self.defaults.process_id.is_empty() {
            format!("p{}", std::process::id())
        } else {
            self.defaults.process_id.clone()
        }
    }

    pub(crate) fn send_blocking_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.send_blocking_timeout_ms)
    }

    pub(crate) fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_timeout_ms)
    }

    pub(crate) fn status_broadcast_limit(&self) -> Duration {
        Duration::from_millis(self.limits.status_broadcast_limit_ms)
    }

    /// Path of the persisted state document for a service instance.
    pub(crate) fn state_file(&self, type_name: &str, service_name: &str) -> PathBuf {
        let file_name = format!("{type_name}-{service_name}.json");
        if !self.paths.data_directory.is_empty() {
            return PathBuf::from(&self.paths.data_directory).join(file_name);
        }
        xdg::BaseDirectories::with_prefix("lattice")
            .ok()
            .and_then(|dirs| dirs.place_data_file(&file_name).ok())
            .unwrap_or_else(|| PathBuf::from(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LatticeConfig::default();
        assert_eq!(config.send_blocking_timeout(), Duration::from_millis(1_000));
        assert_eq!(config.status_broadcast_limit(), Duration::from_millis(1_000));
        assert!(config.process_id().starts_with('p'));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: LatticeConfig =
            toml::from_str("[timeouts]\nsend_blocking_timeout_ms = 250\n").unwrap();
        assert_eq!(config.send_blocking_timeout(), Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(10_000));
    }
}
