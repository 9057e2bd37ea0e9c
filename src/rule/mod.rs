//! 规则模块：负责规则的加载、内置规则库、PII白名单
#[cfg(feature = "embedded-rules")]
pub mod builtin;
pub mod loader;
pub mod pii;

// 导出核心接口
#[cfg(feature = "embedded-rules")]
pub use self::builtin::embedded_rules;
pub use self::loader::RuleLoader;
pub use self::pii::{default_pii_safe_fields, DEFAULT_PII_SAFE_FIELDS};
