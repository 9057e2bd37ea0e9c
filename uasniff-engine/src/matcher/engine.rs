//! 匹配引擎
//! 按依赖拓扑序逐字段执行规则：每个字段的规则已按优先级排序，
//! 第一条模式命中的规则决定该字段：产出值即为贡献，无法产出值则该字段保持未解析，
//! 其余低优先级规则不再执行

use crate::compiler::{CompiledRuleSet, ResolvedFields};
use crate::core::FieldContribution;
use crate::indexer::TreeIndex;

/// 执行全部基础字段的规则
pub fn evaluate(index: &TreeIndex<'_>, rules: &CompiledRuleSet) -> Vec<FieldContribution> {
    let fields: Vec<&str> = rules.primitive_fields().collect();
    evaluate_fields(index, rules, fields.as_slice())
}

/// 执行指定基础字段的规则（派生字段与未知字段忽略）
/// 字段按依赖拓扑序执行，被引用的字段须一并传入
pub fn evaluate_fields<S: AsRef<str>>(
    index: &TreeIndex<'_>,
    rules: &CompiledRuleSet,
    fields: &[S],
) -> Vec<FieldContribution> {
    let graph = rules.graph();
    let mut ordered: Vec<&str> = fields
        .iter()
        .map(AsRef::as_ref)
        .filter(|f| rules.is_primitive(f))
        .collect();
    ordered.sort_by_key(|f| (graph.position(f), *f));
    ordered.dedup();

    let mut resolved = ResolvedFields::default();
    let mut contributions = Vec::with_capacity(ordered.len());

    for field in ordered {
        for matcher in rules.matchers_for_field(field) {
            let Some(hit) = matcher.pattern.eval(index, &resolved) else {
                continue;
            };
            let Some(value) = matcher.value.produce(index, &hit, &resolved) else {
                log::trace!(
                    "Pattern hit without value | Field: {} | Rule #{} | Pattern: {}",
                    field,
                    matcher.order,
                    matcher.pattern.describe()
                );
                break;
            };

            log::trace!(
                "Field resolved | Field: {} | Value: {} | Confidence: {} | Rule #{}",
                field,
                value,
                matcher.confidence,
                matcher.order
            );
            resolved.insert(field.to_string(), value.clone());
            contributions.push(FieldContribution {
                field: field.to_string(),
                value,
                confidence: matcher.confidence,
            });
            break;
        }
    }

    contributions
}
