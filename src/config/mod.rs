//! 配置模块
pub mod analyzer;

pub use self::analyzer::{AnalyzerConfig, AnalyzerConfigBuilder, RuleOrigin, DEFAULT_CACHE_CAPACITY};
