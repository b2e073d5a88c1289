pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod normalize;
pub mod ratios;
pub mod trends;
pub mod types;

pub use config::{EngineConfig, UnitHint};
pub use engine::{AnalysisReport, FinancialAnalyzer};
pub use error::{ErrorCode, FinStatError};
pub use health::{HealthAssessment, RiskLevel};
pub use normalize::InputShape;
pub use trends::{TrendDirection, TrendResult};
pub use types::*;

/// Standard result type for all finstat operations
pub type FinStatResult<T> = Result<T, FinStatError>;
