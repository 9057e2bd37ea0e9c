use regex::{Regex, RegexBuilder};

use super::pattern::{PatternHit, ResolvedFields};
use crate::core::{ExtractSource, NodeId, NodeKind, Transform, ValueDefinition};
use crate::indexer::{PathPattern, TreeIndex};
use crate::utils::{clean_version, expand_template, truncate_version};

/// 编译后的提取来源（正则已预编译）
#[derive(Debug, Clone)]
pub enum CompiledSource {
    Text,
    Version,
    Value,
    Word(usize),
    Regex { regex: Regex, template: String },
}

impl PartialEq for CompiledSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CompiledSource::Text, CompiledSource::Text)
            | (CompiledSource::Version, CompiledSource::Version)
            | (CompiledSource::Value, CompiledSource::Value) => true,
            (CompiledSource::Word(a), CompiledSource::Word(b)) => a == b,
            (
                CompiledSource::Regex { regex: ra, template: ta },
                CompiledSource::Regex { regex: rb, template: tb },
            ) => ra.as_str() == rb.as_str() && ta == tb,
            _ => false,
        }
    }
}

impl CompiledSource {
    fn compile(source: &ExtractSource, context: &str, errors: &mut Vec<String>) -> Option<Self> {
        Some(match source {
            ExtractSource::Text => CompiledSource::Text,
            ExtractSource::Version => CompiledSource::Version,
            ExtractSource::Value => CompiledSource::Value,
            ExtractSource::Word { index } => CompiledSource::Word(*index),
            ExtractSource::Regex { pattern, template } => {
                // 与模式匹配保持一致：大小写不敏感
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => CompiledSource::Regex {
                        regex,
                        template: template.clone(),
                    },
                    Err(e) => {
                        errors.push(format!("{}: invalid regex '{}': {}", context, pattern, e));
                        return None;
                    }
                }
            }
        })
    }

    /// 从节点提取原始值
    fn extract(&self, index: &TreeIndex<'_>, node: NodeId) -> Option<String> {
        let tree = index.tree();
        match self {
            CompiledSource::Text => tree.text(node).map(str::to_string),
            CompiledSource::Version => {
                if tree.node(node).kind == NodeKind::ProductVersion {
                    tree.text(node).map(str::to_string)
                } else {
                    tree.first_descendant_of_kind(node, NodeKind::ProductVersion)
                        .and_then(|v| tree.text(v))
                        .map(str::to_string)
                }
            }
            CompiledSource::Value => match tree.node(node).kind {
                NodeKind::KeyValue => tree
                    .first_child_of_kind(node, NodeKind::Text)
                    .and_then(|t| tree.text(t))
                    .map(str::to_string),
                NodeKind::Text => tree.text(node).map(str::to_string),
                _ => None,
            },
            CompiledSource::Word(idx) => tree
                .text(node)
                .and_then(|text| text.split_whitespace().nth(*idx))
                .map(str::to_string),
            CompiledSource::Regex { regex, template } => {
                let text = tree.text(node)?;
                let captures = regex.captures(text)?;
                expand_template(template, &captures)
            }
        }
    }
}

/// 应用值变换，结果为空视为提取失败
fn apply_transform(transform: Transform, value: String) -> Option<String> {
    let value = match transform {
        Transform::None => Some(value.trim().to_string()),
        Transform::MajorVersion => truncate_version(&value, 1),
        Transform::Truncate { parts } => truncate_version(&value, parts),
        Transform::CleanVersion => Some(clean_version(&value)),
    }?;
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// 编译后的值表达式
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledValue {
    Literal(String),
    Bound {
        source: CompiledSource,
        transform: Transform,
    },
    Path {
        path: PathPattern,
        source: CompiledSource,
        transform: Transform,
    },
    Nth {
        kind: NodeKind,
        n: usize,
        transform: Transform,
    },
    Field {
        name: String,
        transform: Transform,
    },
}

impl CompiledValue {
    pub fn compile(def: &ValueDefinition, context: &str, errors: &mut Vec<String>) -> Option<Self> {
        match def {
            ValueDefinition::Literal { value } => {
                if value.trim().is_empty() {
                    errors.push(format!("{}: literal value is empty", context));
                    return None;
                }
                Some(CompiledValue::Literal(value.clone()))
            }
            ValueDefinition::Bound { source, transform } => Some(CompiledValue::Bound {
                source: CompiledSource::compile(source, context, errors)?,
                transform: *transform,
            }),
            ValueDefinition::Path {
                path,
                source,
                transform,
            } => {
                let parsed = path.parse::<PathPattern>().map_err(|e| {
                    errors.push(format!("{}: invalid path '{}': {}", context, path, e));
                });
                let source = CompiledSource::compile(source, context, errors);
                Some(CompiledValue::Path {
                    path: parsed.ok()?,
                    source: source?,
                    transform: *transform,
                })
            }
            ValueDefinition::Nth { node, n, transform } => Some(CompiledValue::Nth {
                kind: *node,
                n: *n,
                transform: *transform,
            }),
            ValueDefinition::Field { name, transform } => {
                if name.trim().is_empty() {
                    errors.push(format!("{}: field value requires a field name", context));
                    return None;
                }
                Some(CompiledValue::Field {
                    name: name.trim().to_string(),
                    transform: *transform,
                })
            }
        }
    }

    /// 计算值：None 表示无法产出值（规则不生效）
    pub fn produce(
        &self,
        index: &TreeIndex<'_>,
        hit: &PatternHit,
        resolved: &ResolvedFields,
    ) -> Option<String> {
        match self {
            CompiledValue::Literal(value) => Some(value.clone()),
            CompiledValue::Bound { source, transform } => {
                let raw = source.extract(index, hit.node?)?;
                apply_transform(*transform, raw)
            }
            CompiledValue::Path {
                path,
                source,
                transform,
            } => {
                let raw = index
                    .match_path(path)
                    .into_iter()
                    .find_map(|node| source.extract(index, node))?;
                apply_transform(*transform, raw)
            }
            CompiledValue::Nth { kind, n, transform } => {
                let raw = index.nth_text(*kind, *n)?;
                apply_transform(*transform, raw.to_string())
            }
            CompiledValue::Field { name, transform } => {
                let raw = resolved.get(name)?;
                apply_transform(*transform, raw.clone())
            }
        }
    }

    /// 值表达式引用的其他字段
    pub fn referenced_field(&self) -> Option<&str> {
        match self {
            CompiledValue::Field { name, .. } => Some(name),
            _ => None,
        }
    }
}
