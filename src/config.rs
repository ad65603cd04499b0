use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Knowledge Bot core.
#[derive(Debug)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores document chunks.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Dimensionality of the vectors produced by the embedding collaborator.
    pub embedding_dimension: usize,
    /// Base URL of the OpenAI-compatible chat-completion endpoint.
    pub llm_url: String,
    /// Optional bearer token for the chat-completion endpoint.
    pub llm_api_key: Option<String>,
    /// Model identifier passed on every chat-completion request.
    pub llm_model: String,
    /// Default number of chunks returned by similarity search.
    pub retrieval_top_k: usize,
    /// Upper bound on reason/act cycles within one conversational turn.
    pub agent_max_cycles: usize,
}

/// Default `k` applied when neither the caller nor the environment sets one.
pub const DEFAULT_TOP_K: usize = 3;
/// Default bound on reason/act cycles per invocation.
pub const DEFAULT_MAX_CYCLES: usize = 10;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            llm_url: load_env("LLM_URL")?,
            llm_api_key: load_env_optional("LLM_API_KEY"),
            llm_model: load_env("LLM_MODEL")?,
            retrieval_top_k: load_env_optional("RETRIEVAL_TOP_K")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_TOP_K),
            agent_max_cycles: load_env_optional("AGENT_MAX_CYCLES")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("AGENT_MAX_CYCLES".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_MAX_CYCLES),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        llm_url = %config.llm_url,
        llm_model = %config.llm_model,
        embedding_dimension = config.embedding_dimension,
        retrieval_top_k = config.retrieval_top_k,
        agent_max_cycles = config.agent_max_cycles,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
