//! # Server Configuration
//!
//! Loaded once at startup from TOML. Every section and field is optional.
//!
//! ```toml
//! [queue]
//! max_queue_size = 500
//! max_packets_per_second = 40
//! max_commands_per_tick_per_client = 20
//!
//! [server]
//! tick_rate = 20
//! outbound_capacity = 4096
//!
//! [inventory]
//! pickup_radius = 64.0
//! default_hand_offset = 15
//!
//! [data]
//! items = "data/items.toml"
//! recipes = "data/recipes.toml"
//! ```

use std::path::{Path, PathBuf};

use citadel_inventory::InventoryConfig;
use serde::Deserialize;

use crate::error::ConfigError;

/// Admission limits shared by the command and job inboxes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Write-buffer bound; further commands are rejected with `Overflow`.
    pub max_queue_size: usize,
    /// Per-client rate ceiling over a trailing one-second window.
    pub max_packets_per_second: usize,
    /// Per-client commands released per tick; the rest wait.
    pub max_commands_per_tick_per_client: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 500,
            max_packets_per_second: 40,
            max_commands_per_tick_per_client: 20,
        }
    }
}

/// Tick loop settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Bound of the outbound update channel.
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::DEFAULT_TICK_RATE,
            outbound_capacity: 4096,
        }
    }
}

/// Definition file locations.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Item definitions.
    pub items: PathBuf,
    /// Recipes.
    pub recipes: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            items: PathBuf::from("data/items.toml"),
            recipes: PathBuf::from("data/recipes.toml"),
        }
    }
}

/// Complete server configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CitadelConfig {
    /// `[queue]`
    pub queue: QueueConfig,
    /// `[server]`
    pub server: ServerConfig,
    /// `[inventory]`
    pub inventory: InventoryConfig,
    /// `[data]`
    pub data: DataConfig,
}

impl CitadelConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed input, [`ConfigError::Invalid`]
    /// on a zero limit or a negative radius.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(src).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file.
    ///
    /// Relative `[data]` paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] when the file cannot be read; see
    /// [`CitadelConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&src)?;
        if let Some(dir) = path.parent() {
            for file in [&mut config.data.items, &mut config.data.recipes] {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &'static str, value: usize| {
            if value == 0 {
                Err(ConfigError::Invalid {
                    key,
                    reason: "must be at least 1".into(),
                })
            } else {
                Ok(())
            }
        };
        positive("queue.max_queue_size", self.queue.max_queue_size)?;
        positive("queue.max_packets_per_second", self.queue.max_packets_per_second)?;
        positive(
            "queue.max_commands_per_tick_per_client",
            self.queue.max_commands_per_tick_per_client,
        )?;
        positive("server.outbound_capacity", self.server.outbound_capacity)?;
        if self.server.tick_rate == 0 {
            return Err(ConfigError::Invalid {
                key: "server.tick_rate",
                reason: "must be at least 1".into(),
            });
        }
        let radius = self.inventory.pickup_radius;
        if radius.is_nan() || radius < 0.0 {
            return Err(ConfigError::Invalid {
                key: "inventory.pickup_radius",
                reason: format!("{radius} is not a distance"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CitadelConfig::from_toml_str("").unwrap();
        assert_eq!(config, CitadelConfig::default());
        assert_eq!(config.queue.max_queue_size, 500);
        assert_eq!(config.queue.max_packets_per_second, 40);
        assert_eq!(config.queue.max_commands_per_tick_per_client, 20);
        assert_eq!(config.server.tick_rate, 20);
    }

    #[test]
    fn test_partial_sections() {
        let config = CitadelConfig::from_toml_str(
            "[queue]\nmax_queue_size = 8\n[inventory]\ndefault_hand_offset = 4\n",
        )
        .unwrap();
        assert_eq!(config.queue.max_queue_size, 8);
        assert_eq!(config.queue.max_packets_per_second, 40);
        assert_eq!(config.inventory.default_hand_offset, 4);
    }

    #[test]
    fn test_rejects_unknown_and_zero() {
        assert!(matches!(
            CitadelConfig::from_toml_str("[queue]\nmax_queue = 1\n"),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(
            CitadelConfig::from_toml_str("[server]\ntick_rate = 0\n")
                .unwrap_err()
                .to_string(),
            "invalid config value server.tick_rate: must be at least 1"
        );
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            CitadelConfig::load("/nonexistent/citadel.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
