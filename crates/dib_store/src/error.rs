use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The network has no address file yet.
    #[error("No addresses file found for {0}")]
    FileMissing(String),

    #[error("Contract {role} not found in {network} addresses")]
    RoleMissing { network: String, role: String },

    #[error("Invalid network name for address file: {0:?}")]
    InvalidNetworkName(String),

    #[error("Malformed address file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// True for the two "nothing recorded" cases.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileMissing(_) | Self::RoleMissing { .. })
    }
}
