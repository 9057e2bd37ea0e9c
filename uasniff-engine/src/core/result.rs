use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::field::{FieldValue, DEFAULT_FIELD_VALUE, SYNTAX_ERROR_FIELD, UNRESOLVED_CONFIDENCE};

/// 单条 User-Agent 的解析结果
/// - fields: 投影后的请求字段
/// - intermediates: 为计算请求字段而解析的依赖字段（不属于投影结果）
/// - defaults: 字段默认值表（由规则集共享，未计算的字段回退到此处）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    user_agent: String,
    fields: BTreeMap<String, FieldValue>,
    #[serde(skip)]
    intermediates: BTreeMap<String, FieldValue>,
    #[serde(skip)]
    defaults: Arc<BTreeMap<String, String>>,
}

impl ParseResult {
    pub fn new(
        user_agent: impl Into<String>,
        fields: BTreeMap<String, FieldValue>,
        intermediates: BTreeMap<String, FieldValue>,
        defaults: Arc<BTreeMap<String, String>>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            fields,
            intermediates,
            defaults,
        }
    }

    /// 原始 User-Agent 字符串
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// 字段值：投影字段 → 依赖字段 → 声明默认值
    pub fn value(&self, field: &str) -> &str {
        match self.lookup(field) {
            Some(v) => &v.value,
            None => self
                .defaults
                .get(field)
                .map(String::as_str)
                .unwrap_or(DEFAULT_FIELD_VALUE),
        }
    }

    /// 字段置信度（未解析/默认值为-1）
    pub fn confidence(&self, field: &str) -> i32 {
        self.lookup(field)
            .map_or(UNRESOLVED_CONFIDENCE, |v| v.confidence)
    }

    /// 字段是否为默认值回退
    pub fn is_default(&self, field: &str) -> bool {
        self.lookup(field).map_or(true, |v| v.defaulted)
    }

    /// 投影结果中的字段（不含依赖字段）
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// 投影结果字段名（已排序）
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 输入是否被标记为语法错误
    pub fn has_syntax_error(&self) -> bool {
        self.lookup(SYNTAX_ERROR_FIELD)
            .is_some_and(|v| v.is_resolved() && v.value == "true")
    }

    /// 字段名 → 值 的扁平映射（仅投影字段）
    pub fn to_value_map(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }

    #[inline(always)]
    fn lookup(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .get(field)
            .or_else(|| self.intermediates.get(field))
    }
}
