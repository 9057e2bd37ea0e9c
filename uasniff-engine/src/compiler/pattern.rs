use rustc_hash::FxHashMap;

use crate::core::{NodeId, NodeKind, PatternDefinition};
use crate::indexer::TreeIndex;
use crate::utils::{compare_versions, safe_lowercase};

/// 已解析字段值（字段名 → 值），供跨字段模式查询
pub type ResolvedFields = FxHashMap<String, String>;

/// 模式命中结果
/// node: 模式绑定的语法树节点（值提取的起点），跨字段模式无绑定节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternHit {
    pub node: Option<NodeId>,
}

/// 编译后的匹配模式（封闭枚举，单一入口调度）
/// 所有文本比较均为 ASCII 大小写不敏感，编译期统一转小写
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledPattern {
    /// 任意深度的产品名精确匹配，绑定文档顺序第一个
    ExactProduct { name: String },
    /// 产品名匹配且其第一个版本号 ≥ version
    ProductVersionAtLeast { name: String, version: String },
    /// 注释条目文本包含子串
    CommentContains { substring: String },
    /// 注释中 key=value / key:value 精确匹配
    KeyValueEquals { key: String, value: String },
    /// 已解析的其他基础字段值等于 value
    FieldEquals { field: String, value: String },
    AllOf(Vec<CompiledPattern>),
    AnyOf(Vec<CompiledPattern>),
}

impl CompiledPattern {
    /// 编译模式定义，错误追加到 errors（context 用于定位规则）
    pub fn compile(def: &PatternDefinition, context: &str, errors: &mut Vec<String>) -> Option<Self> {
        let required = |value: &Option<String>, arg: &str, errors: &mut Vec<String>| match value {
            Some(v) if !v.trim().is_empty() => Some(safe_lowercase(v.trim())),
            _ => {
                errors.push(format!(
                    "{}: pattern '{}' requires argument '{}'",
                    context, def.kind, arg
                ));
                None
            }
        };

        match def.kind.as_str() {
            "exact_product" => Some(CompiledPattern::ExactProduct {
                name: required(&def.name, "name", errors)?,
            }),
            "product_version_at_least" => {
                let name = required(&def.name, "name", errors);
                let version = required(&def.version, "version", errors);
                Some(CompiledPattern::ProductVersionAtLeast {
                    name: name?,
                    version: version?,
                })
            }
            "comment_contains" => Some(CompiledPattern::CommentContains {
                substring: required(&def.substring, "substring", errors)?,
            }),
            "key_value_equals" => {
                let key = required(&def.key, "key", errors);
                let value = required(&def.value, "value", errors);
                Some(CompiledPattern::KeyValueEquals {
                    key: key?,
                    value: value?,
                })
            }
            "field_equals" => {
                // 字段名保留原始大小写
                let field = match &def.field {
                    Some(f) if !f.trim().is_empty() => Some(f.trim().to_string()),
                    _ => {
                        errors.push(format!(
                            "{}: pattern '{}' requires argument 'field'",
                            context, def.kind
                        ));
                        None
                    }
                };
                let value = required(&def.value, "value", errors);
                Some(CompiledPattern::FieldEquals {
                    field: field?,
                    value: value?,
                })
            }
            kind @ ("all_of" | "any_of") => {
                if def.of.is_empty() {
                    errors.push(format!("{}: pattern '{}' has no sub-patterns", context, kind));
                    return None;
                }
                // 先全部编译，保证一次收集所有子模式错误
                let children: Vec<Option<CompiledPattern>> = def
                    .of
                    .iter()
                    .map(|child| Self::compile(child, context, errors))
                    .collect();
                let children: Option<Vec<CompiledPattern>> = children.into_iter().collect();
                let children = children?;
                if kind == "all_of" {
                    Some(CompiledPattern::AllOf(children))
                } else {
                    Some(CompiledPattern::AnyOf(children))
                }
            }
            other => {
                errors.push(format!("{}: unknown pattern kind '{}'", context, other));
                None
            }
        }
    }

    /// 执行匹配
    pub fn eval(&self, index: &TreeIndex<'_>, resolved: &ResolvedFields) -> Option<PatternHit> {
        let tree = index.tree();
        match self {
            CompiledPattern::ExactProduct { name } => index
                .nodes_with_text(NodeKind::Product, name)
                .first()
                .map(|id| PatternHit { node: Some(*id) }),

            CompiledPattern::ProductVersionAtLeast { name, version } => index
                .nodes_with_text(NodeKind::Product, name)
                .into_iter()
                .find(|product| {
                    tree.first_child_of_kind(*product, NodeKind::ProductVersion)
                        .and_then(|v| tree.text(v))
                        .map_or(false, |actual| {
                            compare_versions(actual, version) != std::cmp::Ordering::Less
                        })
                })
                .map(|id| PatternHit { node: Some(id) }),

            CompiledPattern::CommentContains { substring } => index
                .candidates_containing(NodeKind::CommentEntry, substring)
                .first()
                .map(|id| PatternHit { node: Some(*id) }),

            CompiledPattern::KeyValueEquals { key, value } => index
                .nodes_with_text(NodeKind::KeyValue, key)
                .into_iter()
                .find(|kv| {
                    tree.first_child_of_kind(*kv, NodeKind::Text)
                        .map_or(false, |text| index.lower_text(text) == value)
                })
                .map(|id| PatternHit { node: Some(id) }),

            CompiledPattern::FieldEquals { field, value } => resolved
                .get(field)
                .filter(|actual| actual.eq_ignore_ascii_case(value))
                .map(|_| PatternHit { node: None }),

            CompiledPattern::AllOf(children) => {
                let mut node = None;
                for child in children {
                    let hit = child.eval(index, resolved)?;
                    if node.is_none() {
                        node = hit.node;
                    }
                }
                Some(PatternHit { node })
            }

            CompiledPattern::AnyOf(children) => children
                .iter()
                .find_map(|child| child.eval(index, resolved)),
        }
    }

    /// 模式引用的其他字段（跨字段依赖）
    pub fn referenced_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            CompiledPattern::FieldEquals { field, .. } => out.push(field),
            CompiledPattern::AllOf(children) | CompiledPattern::AnyOf(children) => {
                children.iter().for_each(|c| c.referenced_fields(out))
            }
            _ => {}
        }
    }

    /// 描述模式（日志/调试用）
    pub fn describe(&self) -> String {
        let join = |children: &[CompiledPattern]| {
            children
                .iter()
                .map(CompiledPattern::describe)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            CompiledPattern::ExactProduct { name } => format!("exact_product({})", name),
            CompiledPattern::ProductVersionAtLeast { name, version } => {
                format!("product_version_at_least({}, {})", name, version)
            }
            CompiledPattern::CommentContains { substring } => {
                format!("comment_contains({})", substring)
            }
            CompiledPattern::KeyValueEquals { key, value } => {
                format!("key_value_equals({}, {})", key, value)
            }
            CompiledPattern::FieldEquals { field, value } => {
                format!("field_equals({}, {})", field, value)
            }
            CompiledPattern::AllOf(children) => format!("all_of[{}]", join(children)),
            CompiledPattern::AnyOf(children) => format!("any_of[{}]", join(children)),
        }
    }
}
