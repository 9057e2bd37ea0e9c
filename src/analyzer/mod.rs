//! 解析器模块：对外的 User-Agent 解析入口
pub mod analyzer;

pub use self::analyzer::{build_engine, UserAgentAnalyzer};
