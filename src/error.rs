use thiserror::Error;

/// Failures while locating, loading, or resolving configuration. These are
/// startup-fatal: reported once and the process exits non-zero.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot access config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file '{path}' is not valid JSON: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model '{0}' is not defined in the models table of the config file")]
    UnknownModel(String),

    #[error("unsupported model '{0}'. Supported models: openai, deepseek, qwen")]
    UnsupportedProvider(String),

    #[error("no API key for model '{model}'. Set it in the config file or export {env_var}")]
    MissingApiKey { model: String, env_var: String },

    #[error("invalid proxy configuration: {0}")]
    Proxy(String),
}

/// Errors surfaced by a single exchange with a model backend. Recoverable in
/// interactive mode; mapped to the exit status in `--once` mode.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("network error: {0}")]
    Network(String),

    #[error("authorization rejected by the API (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("rate limited by the API (status {status}): {message}")]
    RateLimit { status: u16, message: String },

    #[error("API request failed (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
