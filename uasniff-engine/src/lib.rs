// 核心公共结构体+枚举（语法树、字段、规则定义、解析结果）
pub mod core;
// 错误定义
pub mod error;
// User-Agent 分词 → 语法树
pub mod tokenizer;
// 语法树索引（按类型 / 精确文本 / n-gram / 路径）
pub mod indexer;
// 规则库编译为可执行规则集
pub mod compiler;
// 规则执行
pub mod matcher;
// 字段依赖图 + 派生 + PII屏蔽 + 投影
pub mod resolver;
// 通用工具
pub mod utils;

// 顶层导出常用类型
pub use crate::core::{
    Derivation, DerivedFieldDefinition, ExtractSource, FieldContribution, FieldDefinition,
    FieldSelection, FieldValue, MatcherDefinition, NodeId, NodeKind, NodePath, ParseResult,
    PatternDefinition, RequestedField, RuleLibrary, SyntaxNode, SyntaxTree, Transform,
    ValueDefinition, DEFAULT_FIELD_VALUE, DROP_PII_FIELD, SYNTAX_ERROR_FIELD,
    UNRESOLVED_CONFIDENCE,
};
pub use compiler::{CompiledPattern, CompiledRuleSet, CompiledValue, Matcher};
pub use error::{CoreError, CoreResult};
pub use indexer::{PathPattern, TreeIndex};
pub use matcher::{evaluate, evaluate_fields};
pub use resolver::{resolve, FieldDependencyGraph, ResolvePlan};
pub use tokenizer::{tokenize, SyntaxError, SyntaxErrorKind, DEFAULT_MAX_LENGTH, MAX_COMMENT_DEPTH};
