use thiserror::Error;

use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Ability '{ability}' not found on unit {unit}")]
    AbilityNotFound { unit: UnitId, ability: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown decision weight: {0}")]
    UnknownWeight(String),

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
