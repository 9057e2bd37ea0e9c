//! 规则集编译
//! 将数据形式的规则库一次性编译为不可变的可执行规则集：
//! - 模式/值表达式编译（正则预编译、路径解析、参数校验）
//! - 字段声明、派生字段、跨字段引用校验
//! - 依赖图构建与环检测
//! 所有问题一次性收集后统一返回，便于规则作者一次修复

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::pattern::CompiledPattern;
use super::value::CompiledValue;
use crate::core::{
    Derivation, RuleLibrary, DEFAULT_FIELD_VALUE, DROP_PII_FIELD, SYNTAX_ERROR_FIELD,
};
use crate::error::{CoreError, CoreResult};
use crate::resolver::FieldDependencyGraph;

/// 编译后的单条匹配规则
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    pub field: String,
    pub confidence: i32,
    pub pattern: CompiledPattern,
    pub value: CompiledValue,
    /// 在规则库中的声明序号（同置信度时的优先顺序）
    pub order: usize,
}

impl Matcher {
    /// 规则引用的其他字段
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.pattern.referenced_fields(&mut refs);
        refs.extend(self.value.referenced_field());
        refs
    }
}

/// 编译后的规则集（构建后不可变，可跨线程共享）
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    /// 基础字段 → 规则（置信度降序，同置信度按声明顺序）
    matchers: BTreeMap<String, Vec<Matcher>>,
    derived: BTreeMap<String, Derivation>,
    defaults: Arc<BTreeMap<String, String>>,
    graph: FieldDependencyGraph,
}

impl CompiledRuleSet {
    pub fn compile(library: &RuleLibrary) -> CoreResult<Self> {
        let mut errors: Vec<String> = Vec::new();
        let mut defaults: BTreeMap<String, String> = BTreeMap::new();
        let mut primitives: BTreeSet<String> = BTreeSet::new();

        // 1. 基础字段声明（重复声明以后者为准）
        for field in &library.fields {
            let name = field.name.trim();
            if name.is_empty() {
                errors.push("field declaration with empty name".to_string());
                continue;
            }
            if !primitives.insert(name.to_string()) {
                log::warn!("Field [{}] declared more than once, last default wins", name);
            }
            defaults.insert(name.to_string(), field.default_value.clone());
        }

        // 2. 派生字段声明
        let mut derived: BTreeMap<String, Derivation> = BTreeMap::new();
        for def in &library.derived {
            let name = def.name.trim();
            if name.is_empty() {
                errors.push("derived field with empty name".to_string());
                continue;
            }
            if primitives.contains(name) {
                errors.push(format!(
                    "field '{}' is declared both as primitive and as derived",
                    name
                ));
                continue;
            }
            if derived.insert(name.to_string(), def.derivation.clone()).is_some() {
                errors.push(format!("derived field '{}' declared more than once", name));
            }
            defaults.insert(name.to_string(), def.default_value.clone());
        }

        // 3. 匹配规则编译
        let mut matchers: BTreeMap<String, Vec<Matcher>> = BTreeMap::new();
        for (order, def) in library.matchers.iter().enumerate() {
            let field = def.field.trim();
            let context = format!("matcher #{} ({})", order, field);
            if field.is_empty() {
                errors.push(format!("{}: missing target field", context));
                continue;
            }
            if derived.contains_key(field) {
                errors.push(format!("{}: matchers cannot target derived field", context));
                continue;
            }
            if def.confidence < 0 {
                errors.push(format!(
                    "{}: confidence must not be negative (got {})",
                    context, def.confidence
                ));
            }
            let pattern = CompiledPattern::compile(&def.pattern, &context, &mut errors);
            let value = CompiledValue::compile(&def.value, &context, &mut errors);
            let (Some(pattern), Some(value)) = (pattern, value) else {
                continue;
            };
            if def.confidence < 0 {
                continue;
            }

            // 未声明的目标字段自动声明，默认值 Unknown
            if primitives.insert(field.to_string()) {
                log::debug!("Field [{}] implicitly declared by {}", field, context);
                defaults.insert(field.to_string(), DEFAULT_FIELD_VALUE.to_string());
            }

            matchers.entry(field.to_string()).or_default().push(Matcher {
                field: field.to_string(),
                confidence: def.confidence,
                pattern,
                value,
                order,
            });
        }

        // 4. 依赖边 + 引用校验
        let mut deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for name in &primitives {
            deps.entry(name.clone()).or_default();
        }
        for rules in matchers.values() {
            for matcher in rules {
                for referenced in matcher.referenced_fields() {
                    if derived.contains_key(referenced) {
                        errors.push(format!(
                            "matcher #{} ({}): references derived field '{}'",
                            matcher.order, matcher.field, referenced
                        ));
                    } else if !primitives.contains(referenced) {
                        errors.push(format!(
                            "matcher #{} ({}): references unknown field '{}'",
                            matcher.order, matcher.field, referenced
                        ));
                    } else {
                        deps.entry(matcher.field.clone())
                            .or_default()
                            .insert(referenced.to_string());
                    }
                }
            }
        }
        for (name, derivation) in &derived {
            let entry = deps.entry(name.clone()).or_default();
            for dep in derivation.dependencies() {
                if primitives.contains(dep) || derived.contains_key(dep) {
                    entry.insert(dep.to_string());
                } else {
                    errors.push(format!(
                        "derived field '{}' depends on unknown field '{}'",
                        name, dep
                    ));
                }
            }
            if derivation.dependencies().is_empty() {
                errors.push(format!("derived field '{}' has no dependencies", name));
            }
        }

        // 5. 依赖图与环检测
        let graph = match FieldDependencyGraph::build(deps) {
            Ok(graph) => graph,
            Err(members) => {
                errors.push(format!(
                    "dependency cycle among fields: {}",
                    members.join(", ")
                ));
                FieldDependencyGraph::default()
            }
        };

        if !errors.is_empty() {
            return Err(CoreError::RuleDefinition(errors));
        }

        // 6. 规则排序：置信度降序，同置信度保持声明顺序
        for rules in matchers.values_mut() {
            rules.sort_by(|a, b| b.confidence.cmp(&a.confidence).then(a.order.cmp(&b.order)));
        }
        for name in &primitives {
            matchers.entry(name.clone()).or_default();
        }

        // 系统字段默认值
        defaults.insert(SYNTAX_ERROR_FIELD.to_string(), "false".to_string());
        defaults.insert(DROP_PII_FIELD.to_string(), "false".to_string());

        log::debug!(
            "Rule set compiled | Primitive fields: {} | Derived fields: {} | Matchers: {}",
            matchers.len(),
            derived.len(),
            library.matchers.len()
        );

        Ok(Self {
            matchers,
            derived,
            defaults: Arc::new(defaults),
            graph,
        })
    }

    /// 字段的匹配规则（已按优先级排序），派生字段或未知字段返回空
    pub fn matchers_for_field(&self, field: &str) -> &[Matcher] {
        self.matchers.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline(always)]
    pub fn is_primitive(&self, field: &str) -> bool {
        self.matchers.contains_key(field)
    }

    #[inline(always)]
    pub fn is_derived(&self, field: &str) -> bool {
        self.derived.contains_key(field)
    }

    /// 规则集可提供的字段（基础 + 派生）
    #[inline(always)]
    pub fn has_field(&self, field: &str) -> bool {
        self.is_primitive(field) || self.is_derived(field)
    }

    pub fn derivation(&self, field: &str) -> Option<&Derivation> {
        self.derived.get(field)
    }

    /// 全部字段名（已排序，不含系统字段）
    pub fn all_fields(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .matchers
            .keys()
            .chain(self.derived.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// 基础字段名（已排序）
    pub fn primitive_fields(&self) -> impl Iterator<Item = &str> {
        self.matchers.keys().map(String::as_str)
    }

    /// 字段默认值（未声明的字段为 Unknown）
    pub fn default_value(&self, field: &str) -> &str {
        self.defaults
            .get(field)
            .map(String::as_str)
            .unwrap_or(DEFAULT_FIELD_VALUE)
    }

    /// 共享的默认值表（解析结果持有同一份）
    pub fn defaults(&self) -> &Arc<BTreeMap<String, String>> {
        &self.defaults
    }

    pub fn graph(&self) -> &FieldDependencyGraph {
        &self.graph
    }

    pub fn matcher_count(&self) -> usize {
        self.matchers.values().map(Vec::len).sum()
    }
}
