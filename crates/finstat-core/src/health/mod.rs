pub mod scorer;

pub use scorer::{assess_health, DimensionScores, HealthAssessment, RiskLevel};
