mod pattern;
mod rule_set;
mod value;

// 对外只导出具体内容，不导出模块名
pub use pattern::{CompiledPattern, PatternHit, ResolvedFields};
pub use rule_set::{CompiledRuleSet, Matcher};
pub use value::{CompiledSource, CompiledValue};
