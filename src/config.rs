use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HealthchatConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub doctor: DoctorConfig,
    pub responder: ResponderConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Chat service port.
    pub port: u16,
    /// Vector service port.
    pub vector_port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Consultations, doctors, and users live here.
    pub db_path: String,
    /// The vector collections persist independently in this file.
    pub vector_db_path: String,
}

/// Bootstrap doctor record and the shared review access key.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DoctorConfig {
    pub name: String,
    pub email: String,
    pub access_key: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResponderConfig {
    /// `"rules"` or `"generative"`.
    pub provider: String,
    pub api_url: String,
    pub model: String,
    /// Usually left empty in the file and supplied via `GEMINI_API_KEY`.
    pub api_key: String,
    pub system_prompt: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RagConfig {
    pub knowledge_k: usize,
    pub conversation_k: usize,
    /// Cosine distance cutoff for context inclusion.
    pub distance_threshold: f64,
    pub max_contexts: usize,
}

impl Default for HealthchatConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            doctor: DoctorConfig::default(),
            responder: ResponderConfig::default(),
            embedding: EmbeddingConfig::default(),
            rag: RagConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7707,
            vector_port: 7708,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_healthchat_dir();
        Self {
            db_path: dir.join("chatbot.db").to_string_lossy().into_owned(),
            vector_db_path: dir.join("vectors.db").to_string_lossy().into_owned(),
        }
    }
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            name: "Dr. Admin".into(),
            email: "admin@healthcare.example".into(),
            access_key: "doctor123".into(),
        }
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            provider: "rules".into(),
            api_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.5-flash".into(),
            api_key: String::new(),
            system_prompt: "You are a helpful, concise health assistant. Provide friendly, \
                            short answers. Always suggest seeing a medical professional for \
                            serious issues."
                .into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_healthchat_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            knowledge_k: 3,
            conversation_k: 2,
            distance_threshold: 0.7,
            max_contexts: 3,
        }
    }
}

/// Returns `~/.healthchat/`
pub fn default_healthchat_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".healthchat")
}

/// Returns the default config file path: `~/.healthchat/config.toml`
pub fn default_config_path() -> PathBuf {
    default_healthchat_dir().join("config.toml")
}

impl HealthchatConfig {
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
            HealthchatConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (HEALTHCHAT_DB, HEALTHCHAT_VECTOR_DB,
    /// HEALTHCHAT_DOCTOR_KEY, HEALTHCHAT_LOG_LEVEL, GEMINI_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HEALTHCHAT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("HEALTHCHAT_VECTOR_DB") {
            self.storage.vector_db_path = val;
        }
        if let Ok(val) = std::env::var("HEALTHCHAT_DOCTOR_KEY") {
            self.doctor.access_key = val;
        }
        if let Ok(val) = std::env::var("HEALTHCHAT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("GEMINI_API_KEY") {
            self.responder.api_key = val;
        }
    }

    /// Resolve the chat database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the vector database path, expanding `~` if needed.
    pub fn resolved_vector_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.vector_db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HealthchatConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7707);
        assert_eq!(config.responder.provider, "rules");
        assert_eq!(config.rag.max_contexts, 3);
        assert!((config.rag.distance_threshold - 0.7).abs() < f64::EPSILON);
        assert!(config.storage.db_path.ends_with("chatbot.db"));
        assert!(config.storage.vector_db_path.ends_with("vectors.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
port = 9000
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[responder]
provider = "generative"
model = "gemini-2.5-pro"

[rag]
knowledge_k = 5
"#;
        let config: HealthchatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.responder.provider, "generative");
        assert_eq!(config.responder.model, "gemini-2.5-pro");
        assert_eq!(config.rag.knowledge_k, 5);
        // defaults still apply for unset fields
        assert_eq!(config.server.vector_port, 7708);
        assert_eq!(config.rag.conversation_k, 2);
        assert_eq!(config.doctor.name, "Dr. Admin");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = HealthchatConfig::default();
        std::env::set_var("HEALTHCHAT_DB", "/tmp/override.db");
        std::env::set_var("HEALTHCHAT_DOCTOR_KEY", "s3cret");
        std::env::set_var("HEALTHCHAT_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.doctor.access_key, "s3cret");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("HEALTHCHAT_DB");
        std::env::remove_var("HEALTHCHAT_DOCTOR_KEY");
        std::env::remove_var("HEALTHCHAT_LOG_LEVEL");
    }
}
