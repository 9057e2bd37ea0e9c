//! uasniff - 规则驱动的 User-Agent 解析工具
//! 原始字符串 → 语法树 → 规则匹配 → 字段解析，输出带置信度的命名字段

// 导出全局错误类型
pub use self::error::{SniffResult, UaSniffError};

// 导出配置模块
pub use self::config::{AnalyzerConfig, AnalyzerConfigBuilder, RuleOrigin, DEFAULT_CACHE_CAPACITY};

// 导出规则模块核心接口
pub use self::rule::{default_pii_safe_fields, RuleLoader, DEFAULT_PII_SAFE_FIELDS};
#[cfg(feature = "embedded-rules")]
pub use self::rule::embedded_rules;

// 导出缓存
pub use self::cache::ResultCache;

// 导出解析器
pub use self::analyzer::{build_engine, UserAgentAnalyzer};

// 透传内核常用类型
pub use uasniff_engine::{
    CoreError, FieldSelection, FieldValue, ParseResult, RequestedField, RuleLibrary,
    DEFAULT_FIELD_VALUE, DEFAULT_MAX_LENGTH, DROP_PII_FIELD, SYNTAX_ERROR_FIELD,
    UNRESOLVED_CONFIDENCE,
};

// 声明所有子模块
pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod rule;
