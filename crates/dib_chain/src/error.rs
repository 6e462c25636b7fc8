/// Revert-reason fragments that mean "this key is already registered".
const CONFLICT_MARKERS: &[&str] = &[
    "already exist",
    "already added",
    "already registered",
    "already whitelisted",
    "already supported",
    "already a relayer",
    "alreadyexists",
    "alreadyregistered",
    "alreadywhitelisted",
];

/// Errors surfaced by the contract layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    /// The contract refused a duplicate registration. Callers treat this as
    /// success for idempotence purposes.
    #[error("{what}: already exists ({reason})")]
    AlreadyExists { what: String, reason: String },

    /// The node or the contract rejected the call for another reason.
    #[error("{what} rejected: {reason}")]
    Rejected { what: String, reason: String },

    /// Transport-level failure talking to the node.
    #[error("{what}: RPC error: {reason}")]
    Rpc { what: String, reason: String },

    /// Submitted, but confirmation failed or timed out.
    #[error("{what}: confirmation failed: {reason}")]
    Confirmation { what: String, reason: String },

    #[error("{0}: receipt carries no contract address")]
    MissingContractAddress(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ChainError {
    /// Classify a revert / rejection reason reported for `what`.
    pub fn from_rejection(what: impl Into<String>, reason: impl Into<String>) -> Self {
        let what = what.into();
        let reason = reason.into();
        if is_conflict_reason(&reason) {
            Self::AlreadyExists { what, reason }
        } else {
            Self::Rejected { what, reason }
        }
    }

    pub fn rpc(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Rpc {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

fn is_conflict_reason(reason: &str) -> bool {
    let lowered = reason.to_ascii_lowercase();
    CONFLICT_MARKERS.iter().any(|marker| lowered.contains(marker))
}
