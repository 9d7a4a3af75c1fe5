//! RotaBot configuration system.
//!
//! TOML file at `~/.rotabot/config.toml`; every section has serde
//! defaults so a missing file yields a runnable config with the
//! built-in rota set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::duration::parse_iso8601;
use crate::error::{Result, RotaBotError};
use crate::types::{AlertSchedule, Rota};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotaBotConfig {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Rota definitions. Static for the process lifetime; editing the
    /// file and restarting is the only way to change them.
    #[serde(default = "default_rotas")]
    pub rotas: Vec<Rota>,
}

impl Default for RotaBotConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig::default(),
            store: StoreConfig::default(),
            rotas: default_rotas(),
        }
    }
}

impl RotaBotConfig {
    /// Load config from the default path, falling back to defaults
    /// when no file exists.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RotaBotError::Config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RotaBotError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the engine cannot work with: duplicate rota ids,
    /// an empty participant list, or an unparseable duty duration.
    /// Checked at startup so a broken rota never gets as far as a
    /// resolve call.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for rota in &self.rotas {
            if rota.participants.is_empty() {
                return Err(RotaBotError::InvalidRota {
                    rota_id: rota.id.clone(),
                    reason: "participant list is empty".into(),
                });
            }
            if parse_iso8601(&rota.duty_duration).is_none() {
                return Err(RotaBotError::InvalidRota {
                    rota_id: rota.id.clone(),
                    reason: format!("unparseable duty_duration '{}'", rota.duty_duration),
                });
            }
            if !seen.insert(rota.id.as_str()) {
                return Err(RotaBotError::Config(format!(
                    "duplicate rota id: {}",
                    rota.id
                )));
            }
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the RotaBot home directory (~/.rotabot).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rotabot")
    }
}

/// Slack connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token (xoxb-...) for the Web API.
    #[serde(default)]
    pub bot_token: String,
    /// App-level token (xapp-...) for Socket Mode.
    #[serde(default)]
    pub app_token: String,
    /// Channel name reminders and operator reports are delivered to.
    #[serde(default = "default_home_channel")]
    pub home_channel: String,
}

fn default_home_channel() -> String {
    "on-call".into()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            app_token: String::new(),
            home_channel: default_home_channel(),
        }
    }
}

/// History store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path. Empty = ~/.rotabot/history.db.
    #[serde(default)]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
        }
    }
}

impl StoreConfig {
    pub fn db_path(&self) -> PathBuf {
        if self.path.is_empty() {
            RotaBotConfig::home_dir().join("history.db")
        } else {
            PathBuf::from(&self.path)
        }
    }
}

/// The built-in rota set, used when no config file is present.
/// Placeholder participants — replace them in config.toml.
fn default_rotas() -> Vec<Rota> {
    vec![
        Rota {
            id: "RC".into(),
            name: "Release Coordinator".into(),
            duty_duration: "P1D".into(),
            participants: vec!["alice".into(), "bob".into()],
            alert: AlertSchedule {
                expression: "0 9 * * *".into(),
                message: "You are Release Coordinator today, please make sure staging is \
                          deployed and tested."
                    .into(),
            },
        },
        Rota {
            id: "BH".into(),
            name: "Bug Hat".into(),
            duty_duration: "P1D".into(),
            participants: vec!["alice".into(), "bob".into()],
            alert: AlertSchedule {
                expression: "0 9 * * *".into(),
                message: "You are Bug Hat today: triage the incoming bug queue.".into(),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_src = r#"
            [slack]
            bot_token = "xoxb-test"
            app_token = "xapp-test"
            home_channel = "oncall-test"

            [store]
            path = "/tmp/history.db"

            [[rotas]]
            id = "RC"
            name = "Release Coordinator"
            duty_duration = "PT10S"
            participants = ["sc", "jo"]
            alert = { expression = "@every 10s", message = "You are RC today" }
        "#;
        let config: RotaBotConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.slack.home_channel, "oncall-test");
        assert_eq!(config.rotas.len(), 1);
        assert_eq!(config.rotas[0].participants, vec!["sc", "jo"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_empty_participants() {
        let mut config = RotaBotConfig::default();
        config.rotas.truncate(1);
        config.rotas[0].participants.clear();
        assert!(matches!(
            config.validate(),
            Err(RotaBotError::InvalidRota { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unparseable_duration() {
        let mut config = RotaBotConfig::default();
        config.rotas.truncate(1);
        config.rotas[0].duty_duration = "bananas".into();
        let err = config.validate().unwrap_err();
        match err {
            RotaBotError::InvalidRota { rota_id, reason } => {
                assert_eq!(rota_id, "RC");
                assert!(reason.contains("bananas"));
            }
            other => panic!("expected InvalidRota, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        RotaBotConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let toml_src = r#"
            [[rotas]]
            id = "RC"
            name = "one"
            duty_duration = "P1D"
            participants = ["a"]
            alert = { expression = "@every 1h", message = "m" }

            [[rotas]]
            id = "RC"
            name = "two"
            duty_duration = "P1D"
            participants = ["b"]
            alert = { expression = "@every 1h", message = "m" }
        "#;
        let config: RotaBotConfig = toml::from_str(toml_src).unwrap();
        assert!(matches!(config.validate(), Err(RotaBotError::Config(_))));
    }

    #[test]
    fn test_store_db_path_default() {
        let store = StoreConfig::default();
        assert!(store.db_path().ends_with(".rotabot/history.db"));
    }
}
