pub mod analyzer;

pub use analyzer::{
    analyze_trends, compound_growth_rate, single_step_growth, GrowthRates, PeriodPoint,
    SubjectStatements, SubjectTrend, TrendDirection, TrendResult, TrendSummary,
};
