use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoringError>;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{table} capacity must be greater than zero")]
    ZeroCapacity { table: &'static str },

    #[error("invalid punishment parameters: {0}")]
    InvalidPunishmentParameters(String),

    #[error("invalid address block {0:?}")]
    InvalidAddressBlock(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
