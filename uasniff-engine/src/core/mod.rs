mod enums;
mod field;
mod node;
mod result;
mod rule;

// 导出常用项
pub use enums::NodeKind;
pub use field::{
    is_system_field, FieldContribution, FieldSelection, FieldValue, RequestedField,
    DEFAULT_FIELD_VALUE, DROP_PII_FIELD, SYNTAX_ERROR_FIELD, UNRESOLVED_CONFIDENCE,
};
pub use node::{NodeId, NodePath, SyntaxNode, SyntaxTree};
pub use result::ParseResult;
pub use rule::{
    Derivation, DerivedFieldDefinition, ExtractSource, FieldDefinition, MatcherDefinition,
    PatternDefinition, RuleLibrary, Transform, ValueDefinition,
};
