pub mod config;
pub mod error;
pub mod types;

pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, Result};
pub use types::{SessionId, TeamId, Timestamp, Turn, UnitId};
