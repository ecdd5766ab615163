use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct JournalConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub agent: AgentConfig,
    pub journal: JournalSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Session id used by stdio and the CLI.
    pub default_session: String,
    /// Pending clarifications untouched for this many days are dropped when
    /// the journal is opened. 0 keeps them forever.
    pub session_ttl_days: u32,
}

/// Where the structuring agent lives.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub base_url: String,
    pub agent_name: String,
    pub agent_id: String,
    pub run_id: String,
    pub timeout_secs: u64,
}

/// Which stored entries conflict detection runs against.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeScope {
    /// Entries of the selected day, plus upcoming events when it is today.
    #[default]
    View,
    /// Every stored entry.
    All,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JournalSettings {
    pub future_horizon_days: u32,
    pub knowledge_scope: KnowledgeScope,
    pub search_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_journal_dir()
            .join("journal.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            default_session: "default".into(),
            session_ttl_days: 30,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5233".into(),
            agent_name: "AgentStructureResult".into(),
            agent_id: String::new(),
            run_id: String::new(),
            timeout_secs: 90,
        }
    }
}

impl AgentConfig {
    /// `{base_url}/api/agents/{agent_name}/{agent_id}/{run_id}`
    pub fn endpoint(&self) -> String {
        format!(
            "{}/api/agents/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.agent_name,
            self.agent_id,
            self.run_id
        )
    }

    pub fn is_configured(&self) -> bool {
        !self.agent_id.is_empty() && !self.run_id.is_empty()
    }
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            future_horizon_days: 60,
            knowledge_scope: KnowledgeScope::View,
            search_limit: 10,
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `~/.me-journal/`
pub fn default_journal_dir() -> PathBuf {
    home_dir().join(".me-journal")
}

/// Returns the default config file path: `~/.me-journal/config.toml`
pub fn default_config_path() -> PathBuf {
    default_journal_dir().join("config.toml")
}

impl JournalConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            JournalConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ME_JOURNAL_DB, ME_JOURNAL_SESSION,
    /// ME_JOURNAL_LOG_LEVEL, and the ME_JOURNAL_AGENT_* / ME_JOURNAL_RUN_ID
    /// agent coordinates).
    fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 6] = [
            ("ME_JOURNAL_DB", &mut self.storage.db_path),
            ("ME_JOURNAL_SESSION", &mut self.storage.default_session),
            ("ME_JOURNAL_LOG_LEVEL", &mut self.server.log_level),
            ("ME_JOURNAL_AGENT_URL", &mut self.agent.base_url),
            ("ME_JOURNAL_AGENT_ID", &mut self.agent.agent_id),
            ("ME_JOURNAL_RUN_ID", &mut self.agent.run_id),
        ];
        for (var, slot) in overrides {
            if let Ok(val) = std::env::var(var) {
                *slot = val;
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = JournalConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.storage.default_session, "default");
        assert_eq!(config.storage.session_ttl_days, 30);
        assert_eq!(config.agent.timeout_secs, 90);
        assert_eq!(config.journal.future_horizon_days, 60);
        assert_eq!(config.journal.knowledge_scope, KnowledgeScope::View);
        assert!(config.storage.db_path.ends_with("journal.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"
session_ttl_days = 0

[agent]
base_url = "https://agents.example.com/"
agent_id = "a-1"
run_id = "r-1"

[journal]
knowledge_scope = "all"
"#;
        let config: JournalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.storage.session_ttl_days, 0);
        assert_eq!(config.journal.knowledge_scope, KnowledgeScope::All);
        assert_eq!(
            config.agent.endpoint(),
            "https://agents.example.com/api/agents/AgentStructureResult/a-1/r-1"
        );
        assert!(config.agent.is_configured());
        // defaults still apply for unset fields
        assert_eq!(config.storage.default_session, "default");
        assert_eq!(config.journal.search_limit, 10);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = JournalConfig::default();
        std::env::set_var("ME_JOURNAL_DB", "/tmp/override.db");
        std::env::set_var("ME_JOURNAL_SESSION", "phone");
        std::env::set_var("ME_JOURNAL_RUN_ID", "run-9");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.storage.default_session, "phone");
        assert_eq!(config.agent.run_id, "run-9");

        // Clean up
        std::env::remove_var("ME_JOURNAL_DB");
        std::env::remove_var("ME_JOURNAL_SESSION");
        std::env::remove_var("ME_JOURNAL_RUN_ID");
    }
}
