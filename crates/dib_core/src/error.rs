use std::path::PathBuf;

/// Configuration errors. All of them are fatal to the invoking command.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Network {0} not found in config")]
    NetworkNotFound(String),

    #[error("Network {0} is disabled in config")]
    NetworkDisabled(String),

    #[error("Token {0} not found in config")]
    TokenNotFound(String),

    #[error("RPC for {network} reports chain id {actual}, config says {expected}")]
    ChainMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },

    #[error("No bridge hub network found in config")]
    NoBridgeHub,

    #[error("Invalid network registry: {0}")]
    InvalidRegistry(String),

    #[error("Missing environment variable {0}")]
    MissingEnv(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
