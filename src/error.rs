//! Error types for content and configuration integrity.
//!
//! Only data bugs surface as errors. Ordinary game flow (no target in range,
//! a target dying mid-resolution, an empty pool) resolves silently inside the
//! systems and never reaches this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown combat style `{0}`")]
    UnknownStyle(String),
    #[error("duplicate combat style `{0}`")]
    DuplicateStyle(String),
    #[error("ranged style `{0}` has no projectile definition")]
    MissingProjectile(String),
    #[error("unknown unit definition `{0}`")]
    UnknownUnit(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no AI-driven unit with id {0}")]
    UnknownEntity(u64),
    #[error("no living player to anchor the request")]
    NoPlayer,
    #[error("content parse error")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
