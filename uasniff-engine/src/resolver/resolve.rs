//! 字段解析
//! 构建期：根据请求字段计算解析计划（依赖闭包 + 拓扑序 + PII策略）
//! 解析期：种子 → 派生 → PII屏蔽 → 投影，四个阶段严格按序执行

use std::collections::{BTreeMap, BTreeSet};

use crate::compiler::CompiledRuleSet;
use crate::core::{
    is_system_field, Derivation, FieldContribution, FieldSelection, FieldValue, ParseResult,
    RequestedField, DROP_PII_FIELD, SYNTAX_ERROR_FIELD, UNRESOLVED_CONFIDENCE,
};
use crate::error::{CoreError, CoreResult};
use crate::utils::major_version;

/// 解析计划（构建期计算一次，解析期只读）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvePlan {
    /// 投影字段（已排序，含请求的系统字段）
    requested: Vec<String>,
    /// 需要执行规则的基础字段（拓扑序）
    primitives: Vec<String>,
    /// 需要计算的派生字段（拓扑序）
    derived: Vec<String>,
    drop_pii: bool,
    pii_safe: BTreeSet<String>,
}

impl ResolvePlan {
    /// 计算解析计划
    /// - selection 含 DropPii 哨兵时同样开启PII过滤
    /// - 请求的字段不存在，或开启PII过滤时显式请求非安全字段，一次性报告全部
    /// - 除系统字段外只请求了 DropPii 哨兵时，展开为全部PII安全字段
    pub fn new(
        rules: &CompiledRuleSet,
        selection: &FieldSelection,
        pii_safe: &BTreeSet<String>,
        drop_pii: bool,
    ) -> CoreResult<Self> {
        let drop_pii = drop_pii || selection.requests_drop_pii();
        let is_safe = |name: &str| is_system_field(name) || pii_safe.contains(name);

        let mut requested: BTreeSet<String> = BTreeSet::new();
        match selection {
            FieldSelection::All => {
                requested.extend(rules.all_fields().into_iter().map(str::to_string));
                requested.insert(SYNTAX_ERROR_FIELD.to_string());
                if drop_pii {
                    requested.insert(DROP_PII_FIELD.to_string());
                }
            }
            FieldSelection::Only(fields) => {
                let mut unknown: Vec<&str> = Vec::new();
                for field in fields {
                    let name = field.name();
                    match field {
                        RequestedField::DropPii => {}
                        RequestedField::Field(name) if is_system_field(name) => {}
                        RequestedField::Field(name) if !rules.has_field(name) => {
                            unknown.push(name);
                            continue;
                        }
                        RequestedField::Field(name) if drop_pii && !is_safe(name) => {
                            unknown.push(name);
                            continue;
                        }
                        RequestedField::Field(_) => {}
                    }
                    requested.insert(name.to_string());
                }
                if !unknown.is_empty() {
                    return Err(CoreError::unknown_fields(unknown));
                }
                // 只请求了 DropPii 哨兵：等价于请求全部PII安全字段
                if selection.requests_drop_pii() && requested.iter().all(|f| is_system_field(f)) {
                    requested.extend(
                        rules
                            .all_fields()
                            .into_iter()
                            .filter(|name| is_safe(*name))
                            .map(str::to_string),
                    );
                    requested.insert(SYNTAX_ERROR_FIELD.to_string());
                }
            }
        }

        let needed = rules
            .graph()
            .closure(requested.iter().map(String::as_str).filter(|f| !is_system_field(f)));
        let (primitives, derived): (Vec<String>, Vec<String>) = rules
            .graph()
            .topological_order()
            .iter()
            .filter(|name| needed.contains(*name))
            .cloned()
            .partition(|name| rules.is_primitive(name));

        log::debug!(
            "Resolve plan | Requested: {} | Primitive: {} | Derived: {} | Drop PII: {}",
            requested.len(),
            primitives.len(),
            derived.len(),
            drop_pii
        );

        Ok(Self {
            requested: requested.into_iter().collect(),
            primitives,
            derived,
            drop_pii,
            pii_safe: pii_safe.clone(),
        })
    }

    /// 投影字段（已排序）
    pub fn requested_fields(&self) -> &[String] {
        &self.requested
    }

    /// 需要执行规则的基础字段（拓扑序）
    pub fn primitive_fields(&self) -> &[String] {
        &self.primitives
    }

    /// 需要计算的派生字段（拓扑序）
    pub fn derived_fields(&self) -> &[String] {
        &self.derived
    }

    pub fn drop_pii(&self) -> bool {
        self.drop_pii
    }

    /// 系统字段始终安全
    pub fn is_pii_safe(&self, field: &str) -> bool {
        is_system_field(field) || self.pii_safe.contains(field)
    }
}

/// 合并规则贡献，计算派生字段，屏蔽PII，投影为解析结果
pub fn resolve(
    user_agent: &str,
    contributions: Vec<FieldContribution>,
    rules: &CompiledRuleSet,
    plan: &ResolvePlan,
    syntax_error: bool,
) -> ParseResult {
    let mut values: BTreeMap<String, FieldValue> = BTreeMap::new();

    // 1. 种子：计划内的基础字段先置为默认值，再写入规则贡献
    //    语法错误的输入不可信，全部字段保持默认值（-1），仅报告 __SyntaxError__
    for name in &plan.primitives {
        values.insert(name.clone(), FieldValue::default_value(rules.default_value(name)));
    }
    if !syntax_error {
        for contribution in contributions {
            if let Some(slot) = values.get_mut(&contribution.field) {
                *slot = FieldValue::resolved(contribution.value, contribution.confidence);
            }
        }
    }

    // 2. 派生（拓扑序保证依赖已就绪）
    for name in &plan.derived {
        let value = rules
            .derivation(name)
            .and_then(|derivation| derive(derivation, &values))
            .unwrap_or_else(|| FieldValue::default_value(rules.default_value(name)));
        values.insert(name.clone(), value);
    }

    // 3. PII屏蔽（派生之后执行，依赖字段一并屏蔽）
    let mut suppressed = false;
    if plan.drop_pii {
        for (name, value) in values.iter_mut() {
            if plan.is_pii_safe(name) {
                continue;
            }
            if value.is_resolved() {
                suppressed = true;
            }
            *value = FieldValue::default_value(rules.default_value(name));
        }
    }

    // 系统字段
    values.insert(
        SYNTAX_ERROR_FIELD.to_string(),
        if syntax_error {
            FieldValue::resolved("true", 0)
        } else {
            FieldValue::default_value(rules.default_value(SYNTAX_ERROR_FIELD))
        },
    );
    if plan.drop_pii {
        values.insert(
            DROP_PII_FIELD.to_string(),
            if suppressed {
                FieldValue::resolved("true", 0)
            } else {
                FieldValue::default_value(rules.default_value(DROP_PII_FIELD))
            },
        );
    }

    // 4. 投影
    let mut fields = BTreeMap::new();
    for name in &plan.requested {
        let value = values
            .remove(name)
            .unwrap_or_else(|| FieldValue::default_value(rules.default_value(name)));
        fields.insert(name.clone(), value);
    }

    ParseResult::new(user_agent, fields, values, rules.defaults().clone())
}

/// 计算派生值：任一依赖未解析则返回None（回退默认值）
/// 置信度取依赖中的最小值
fn derive(derivation: &Derivation, values: &BTreeMap<String, FieldValue>) -> Option<FieldValue> {
    let mut inputs: Vec<&FieldValue> = Vec::new();
    for dep in derivation.dependencies() {
        let value = values.get(dep)?;
        if value.confidence <= UNRESOLVED_CONFIDENCE {
            return None;
        }
        inputs.push(value);
    }
    let confidence = inputs.iter().map(|v| v.confidence).min()?;

    let value = match derivation {
        Derivation::Concat { separator, .. } => inputs
            .iter()
            .map(|v| v.value.as_str())
            .collect::<Vec<_>>()
            .join(separator),
        Derivation::MajorVersion { .. } => major_version(&inputs.first()?.value)?,
    };
    Some(FieldValue::resolved(value, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        DerivedFieldDefinition, FieldDefinition, MatcherDefinition, PatternDefinition,
        RuleLibrary, ValueDefinition,
    };

    fn rules() -> CompiledRuleSet {
        let library = RuleLibrary {
            fields: vec![
                FieldDefinition::new("AgentName", "Unknown"),
                FieldDefinition::new("AgentVersion", "??"),
                FieldDefinition::new("DeviceClass", "Unknown"),
            ],
            matchers: vec![MatcherDefinition::new(
                "DeviceClass",
                10,
                PatternDefinition::field_equals("AgentName", "Googlebot"),
                ValueDefinition::literal("Robot"),
            )],
            derived: vec![
                DerivedFieldDefinition::new(
                    "AgentVersionMajor",
                    "??",
                    Derivation::major_version("AgentVersion"),
                ),
                DerivedFieldDefinition::new(
                    "AgentNameVersion",
                    "Unknown",
                    Derivation::concat(&["AgentName", "AgentVersion"]),
                ),
                DerivedFieldDefinition::new(
                    "AgentNameVersionMajor",
                    "Unknown",
                    Derivation::concat(&["AgentName", "AgentVersionMajor"]),
                ),
            ],
        };
        CompiledRuleSet::compile(&library).unwrap()
    }

    fn safe(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn only(names: &[&str]) -> FieldSelection {
        FieldSelection::Only(names.iter().map(|n| RequestedField::from(*n)).collect())
    }

    fn contributions() -> Vec<FieldContribution> {
        vec![
            FieldContribution {
                field: "AgentName".into(),
                value: "Chrome".into(),
                confidence: 100,
            },
            FieldContribution {
                field: "AgentVersion".into(),
                value: "53.0.2785.124".into(),
                confidence: 80,
            },
        ]
    }

    #[test]
    fn test_plan_closure_and_order() {
        let rules = rules();
        let plan =
            ResolvePlan::new(&rules, &only(&["AgentNameVersionMajor"]), &safe(&[]), false).unwrap();
        assert_eq!(plan.requested_fields(), &["AgentNameVersionMajor"]);
        assert_eq!(plan.primitive_fields(), &["AgentName", "AgentVersion"]);
        assert_eq!(plan.derived_fields(), &["AgentVersionMajor", "AgentNameVersionMajor"]);
        assert!(!plan.drop_pii());
    }

    #[test]
    fn test_plan_unknown_fields_reported_together() {
        let rules = rules();
        let err = ResolvePlan::new(
            &rules,
            &only(&["SecondNonexistentField", "AgentName", "FirstNonexistentField"]),
            &safe(&[]),
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "We cannot provide these fields:[FirstNonexistentField, SecondNonexistentField]"
        );
    }

    #[test]
    fn test_plan_rejects_explicit_unsafe_field_when_dropping() {
        let rules = rules();
        let err = ResolvePlan::new(
            &rules,
            &only(&["AgentNameVersion", "AgentNameVersionMajor", DROP_PII_FIELD]),
            &safe(&["AgentNameVersionMajor"]),
            false,
        )
        .unwrap_err();
        assert_eq!(err, CoreError::UnknownFields(vec!["AgentNameVersion".into()]));
    }

    #[test]
    fn test_plan_drop_pii_sentinel_alone_expands_to_safe_fields() {
        let rules = rules();
        let pii_safe = safe(&["AgentName", "AgentNameVersionMajor", "DeviceClass"]);
        let plan = ResolvePlan::new(
            &rules,
            &only(&[DROP_PII_FIELD, SYNTAX_ERROR_FIELD]),
            &pii_safe,
            false,
        )
        .unwrap();
        assert!(plan.drop_pii());
        assert_eq!(
            plan.requested_fields(),
            &[
                "AgentName",
                "AgentNameVersionMajor",
                "DeviceClass",
                DROP_PII_FIELD,
                SYNTAX_ERROR_FIELD
            ]
        );

        let result = resolve("ua", contributions(), &rules, &plan, false);
        assert_eq!(result.value("AgentNameVersionMajor"), "Chrome 53");
        assert_eq!(result.value(DROP_PII_FIELD), "true");
        assert!(result.get("AgentVersion").is_none());
        assert!(result.get("AgentNameVersion").is_none());
    }

    #[test]
    fn test_resolve_derivations_and_intermediates() {
        let rules = rules();
        let plan =
            ResolvePlan::new(&rules, &only(&["AgentNameVersionMajor"]), &safe(&[]), false).unwrap();
        let result = resolve("ua", contributions(), &rules, &plan, false);

        let projected: Vec<&str> = result.field_names().collect();
        assert_eq!(projected, vec!["AgentNameVersionMajor"]);
        assert_eq!(result.value("AgentNameVersionMajor"), "Chrome 53");
        // 置信度取依赖最小值
        assert_eq!(result.confidence("AgentNameVersionMajor"), 80);
        // 依赖字段可读取，但不属于投影
        assert_eq!(result.value("AgentName"), "Chrome");
        // 未在计划内的字段报告默认值
        assert_eq!(result.value("DeviceClass"), "Unknown");
        assert_eq!(result.confidence("DeviceClass"), -1);
    }

    #[test]
    fn test_unresolved_dependency_defaults_derived() {
        let rules = rules();
        let plan = ResolvePlan::new(&rules, &FieldSelection::All, &safe(&[]), false).unwrap();
        let partial = vec![FieldContribution {
            field: "AgentName".into(),
            value: "Chrome".into(),
            confidence: 100,
        }];
        let result = resolve("ua", partial, &rules, &plan, false);
        assert_eq!(result.value("AgentName"), "Chrome");
        assert_eq!(result.value("AgentNameVersion"), "Unknown");
        assert_eq!(result.confidence("AgentNameVersion"), -1);
        assert_eq!(result.value("AgentVersionMajor"), "??");
        assert!(!result.has_syntax_error());
    }

    #[test]
    fn test_syntax_error_discards_contributions() {
        let rules = rules();
        let plan = ResolvePlan::new(&rules, &FieldSelection::All, &safe(&[]), false).unwrap();
        let result = resolve("ua", contributions(), &rules, &plan, true);

        assert_eq!(result.value(SYNTAX_ERROR_FIELD), "true");
        assert_eq!(result.confidence(SYNTAX_ERROR_FIELD), 0);
        assert!(result.has_syntax_error());
        for (name, value) in result.iter().filter(|(name, _)| *name != SYNTAX_ERROR_FIELD) {
            assert_eq!(value.confidence, -1, "{} must fall back to its default", name);
            assert!(value.defaulted);
        }
        assert_eq!(result.value("AgentName"), "Unknown");
        assert_eq!(result.value("AgentVersion"), "??");
        assert_eq!(result.value("AgentNameVersionMajor"), "Unknown");
    }

    #[test]
    fn test_syntax_error_with_drop_pii_reports_nothing_suppressed() {
        let rules = rules();
        let plan = ResolvePlan::new(&rules, &FieldSelection::All, &safe(&["AgentName"]), true)
            .unwrap();
        let result = resolve("ua", contributions(), &rules, &plan, true);
        assert!(result.has_syntax_error());
        assert_eq!(result.value(DROP_PII_FIELD), "false");
    }

    #[test]
    fn test_pii_mask_after_derivation() {
        let rules = rules();
        let plan = ResolvePlan::new(
            &rules,
            &FieldSelection::All,
            &safe(&["AgentName", "AgentVersionMajor", "AgentNameVersionMajor"]),
            true,
        )
        .unwrap();
        let result = resolve("ua", contributions(), &rules, &plan, false);

        assert_eq!(result.value("AgentNameVersionMajor"), "Chrome 53");
        assert_eq!(result.value("AgentVersionMajor"), "53");
        assert_eq!(result.value("AgentVersion"), "??");
        assert_eq!(result.confidence("AgentVersion"), -1);
        assert_eq!(result.value("AgentNameVersion"), "Unknown");
        assert_eq!(result.value(DROP_PII_FIELD), "true");
        assert_eq!(result.value(SYNTAX_ERROR_FIELD), "false");
        assert_eq!(result.confidence(SYNTAX_ERROR_FIELD), -1);
    }

    #[test]
    fn test_drop_pii_reports_false_when_nothing_suppressed() {
        let rules = rules();
        let plan = ResolvePlan::new(
            &rules,
            &only(&["AgentName", DROP_PII_FIELD]),
            &safe(&["AgentName"]),
            false,
        )
        .unwrap();
        assert!(plan.drop_pii());
        let result = resolve("ua", contributions(), &rules, &plan, false);
        assert_eq!(result.value(DROP_PII_FIELD), "false");
        assert_eq!(result.confidence(DROP_PII_FIELD), -1);
        assert_eq!(
            result.field_names().collect::<Vec<_>>(),
            vec!["AgentName", DROP_PII_FIELD]
        );
    }
}
