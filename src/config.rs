use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::chooser::{ChooserError, ChooserRegistry};
use crate::nonsense::Generator;
use crate::theme::ThemeTable;

const DEFAULT_CONFIG_PATH: &str = "usher.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is not set.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar { name: String, value: String },
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid theme pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Invalid role chooser: {0}")]
    Chooser(#[from] ChooserError),
}

/// Bot configuration: secrets from the environment, everything else from a
/// JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub discord_token: String,
    /// Guild to register commands in, besides the global registration.
    #[serde(skip)]
    pub guild_id: Option<GuildId>,

    /// Prefix that addresses the bot in plain messages.
    pub prefix: String,
    /// Prefix for text commands such as `!nonsense`.
    pub command_prefix: String,
    pub activity: Option<String>,
    /// Text after the prefix that triggers `greeting_reply`.
    pub greeting_trigger: String,
    pub greeting_reply: String,
    /// Mentions of these roles are relayed to every member by DM.
    pub broadcast_roles: Vec<RoleId>,
    pub welcome: Option<WelcomeConfig>,
    pub farewell: Option<FarewellConfig>,
    /// At most one chooser per channel.
    pub choosers: Vec<ChooserConfig>,
    /// Theme rules, top to bottom. The built-in table is used when absent.
    pub themes: Option<Vec<ThemeRuleConfig>>,
    pub corpus_dir: PathBuf,
    pub nonsense: Generator,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            guild_id: None,
            prefix: "!s ".to_string(),
            command_prefix: "!".to_string(),
            activity: None,
            greeting_trigger: "привет, бот".to_string(),
            greeting_reply: "Привет!".to_string(),
            broadcast_roles: Vec::new(),
            welcome: None,
            farewell: None,
            choosers: Vec::new(),
            themes: None,
            corpus_dir: PathBuf::from("replies"),
            nonsense: Generator::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WelcomeConfig {
    pub channel_id: ChannelId,
    /// Role given to every new member, looked up by name.
    pub role_name: Option<String>,
    /// Supports the `{user}` placeholder.
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FarewellConfig {
    pub channel_id: ChannelId,
    /// Supports the `{user}` placeholder.
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChooserConfig {
    pub channel_id: ChannelId,
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub choices: Vec<ChoiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceConfig {
    /// Unicode emoji, or a custom emoji such as `<:cat:706936837247336568>`.
    pub icon: String,
    pub role_id: RoleId,
    /// Sent by DM when the member picks the role.
    pub add_message: String,
    /// Sent by DM when the member drops the role.
    pub remove_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeRuleConfig {
    pub pattern: String,
    pub theme: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which resolves environment
    /// variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("DISCORD_TOKEN".to_string()))?;

        let guild_id = match lookup("GUILD_ID") {
            Some(value) => Some(
                value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .map(GuildId::new)
                    .ok_or(ConfigError::InvalidEnvVar {
                        name: "GUILD_ID".to_string(),
                        value,
                    })?,
            ),
            None => None,
        };

        let mut config = match lookup("USHER_CONFIG") {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            None => {
                warn!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                Self::default()
            }
        };

        config.discord_token = discord_token;
        config.guild_id = guild_id;
        Ok(config)
    }

    /// Theme rules from the file, or the built-in table when there are none.
    pub fn theme_table(&self) -> Result<ThemeTable, ConfigError> {
        let table = match &self.themes {
            Some(rules) => ThemeTable::from_config(rules)?,
            None => ThemeTable::builtin()?,
        };
        Ok(table)
    }

    pub fn chooser_registry(&self) -> Result<ChooserRegistry, ConfigError> {
        Ok(ChooserRegistry::from_config(&self.choosers)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "prefix": "!u ",
        "activity": "Merry Madness",
        "broadcast_roles": ["664724324581769216", 656819890082152450],
        "welcome": {
            "channel_id": "627434071961632778",
            "role_name": "Прохожие",
            "message": "**{user}**, привет!"
        },
        "choosers": [{
            "channel_id": "603337113584402432",
            "title": "Роли",
            "choices": [
                {
                    "icon": "❤️",
                    "role_id": "664724324581769216",
                    "add_message": "Добро пожаловать в рейд!",
                    "remove_message": "Жаль, что уходишь."
                }
            ]
        }],
        "themes": [{ "pattern": "(?i)\\bрейд", "theme": "raid" }],
        "nonsense": { "coherence": 3 }
    }"#;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_sample_config() {
        let file = write_config(SAMPLE);
        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.prefix, "!u ");
        assert_eq!(config.broadcast_roles.len(), 2);
        assert_eq!(config.broadcast_roles[1], RoleId::new(656819890082152450));
        assert_eq!(config.welcome.unwrap().role_name.as_deref(), Some("Прохожие"));
        let chooser = &config.choosers[0];
        assert!(chooser.notes.is_empty());
        assert_eq!(chooser.choices[0].icon, "❤️");
        let themes = config.themes.unwrap();
        assert_eq!(themes[0].confidence, 1.0);
        assert_eq!(config.nonsense.coherence, 3);
        assert_eq!(config.nonsense.max_words, Generator::default().max_words);
        // Untouched fields keep their defaults.
        assert_eq!(config.greeting_reply, "Привет!");
        assert_eq!(config.corpus_dir, PathBuf::from("replies"));
    }

    #[test]
    fn test_from_lookup_reads_env() {
        let file = write_config(SAMPLE);
        let env: HashMap<&str, String> = HashMap::from([
            ("DISCORD_TOKEN", "secret".to_string()),
            ("GUILD_ID", "409658506967384065".to_string()),
            ("USHER_CONFIG", file.path().display().to_string()),
        ]);

        let config = Config::from_lookup(|name| env.get(name).cloned()).unwrap();
        assert_eq!(config.discord_token, "secret");
        assert_eq!(config.guild_id, Some(GuildId::new(409658506967384065)));
        assert_eq!(config.activity.as_deref(), Some("Merry Madness"));
    }

    #[test]
    fn test_missing_token() {
        let err = Config::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "DISCORD_TOKEN"));
    }

    #[test]
    fn test_invalid_guild_id() {
        let err = Config::from_lookup(|name| match name {
            "DISCORD_TOKEN" => Some("secret".to_string()),
            "GUILD_ID" => Some("not-a-number".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = Config::from_lookup(|name| match name {
            "DISCORD_TOKEN" => Some("secret".to_string()),
            "USHER_CONFIG" => Some(path.display().to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config("{ \"prefix\": ");
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_sample_builds_tables() {
        let file = write_config(SAMPLE);
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.theme_table().unwrap().len(), 1);
        assert_eq!(config.chooser_registry().unwrap().len(), 1);
        assert!(!Config::default().theme_table().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_chooser_definition() {
        let file = write_config(
            r#"{
                "choosers": [
                    { "channel_id": "1", "choices": [] }
                ]
            }"#,
        );
        let config = Config::from_file(file.path()).unwrap();
        let err = config.chooser_registry().unwrap_err();
        assert!(matches!(err, ConfigError::Chooser(ChooserError::NoChoices)));
    }

    #[test]
    fn test_invalid_theme_pattern() {
        let file = write_config(r#"{ "themes": [{ "pattern": "(unclosed", "theme": "broken" }] }"#);
        let config = Config::from_file(file.path()).unwrap();
        assert!(matches!(config.theme_table(), Err(ConfigError::InvalidPattern(_))));
    }
}
