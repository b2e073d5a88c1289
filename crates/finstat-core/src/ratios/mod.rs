pub mod bounds;
pub mod cache;
pub mod calculator;

pub use cache::{CacheStats, RatioCache};
pub use calculator::{calculate_ratios, extract_key_metrics};
