//! 解析器配置，存储所有可配置项
use std::collections::BTreeSet;
use std::path::PathBuf;

use uasniff_engine::{FieldSelection, RequestedField, DEFAULT_MAX_LENGTH};

use crate::rule::default_pii_safe_fields;

/// 默认缓存容量（条）
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// 规则来源
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuleOrigin {
    /// 编译期内置规则
    #[default]
    Embedded,
    /// 本地JSON规则文件（替换内置规则）
    LocalFile(PathBuf),
}

/// 解析器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    // 请求字段
    pub fields: FieldSelection,
    // 是否开启PII过滤
    pub drop_pii: bool,
    // PII安全字段白名单
    pub pii_safe_fields: BTreeSet<String>,
    // 结果缓存容量，0 表示关闭缓存
    pub cache_capacity: usize,
    // 输入最大长度（字节）
    pub max_length: usize,
    // 规则来源
    pub origin: RuleOrigin,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fields: FieldSelection::All,
            drop_pii: false,
            pii_safe_fields: default_pii_safe_fields(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_length: DEFAULT_MAX_LENGTH,
            origin: RuleOrigin::Embedded,
        }
    }
}

impl AnalyzerConfig {
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个请求字段（此前为全部字段时切换为显式列表）
    pub fn with_field(mut self, field: impl Into<RequestedField>) -> Self {
        let field = field.into();
        match &mut self.config.fields {
            FieldSelection::Only(fields) => fields.push(field),
            FieldSelection::All => self.config.fields = FieldSelection::Only(vec![field]),
        }
        self
    }

    pub fn with_fields<I, F>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<RequestedField>,
    {
        fields.into_iter().fold(self, |builder, f| builder.with_field(f))
    }

    pub fn with_all_fields(mut self) -> Self {
        self.config.fields = FieldSelection::All;
        self
    }

    pub fn drop_pii_fields(mut self, drop_pii: bool) -> Self {
        self.config.drop_pii = drop_pii;
        self
    }

    /// 替换PII安全字段白名单
    pub fn pii_safe_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pii_safe_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn without_cache(self) -> Self {
        self.cache_capacity(0)
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.config.max_length = max_length;
        self
    }

    pub fn origin(mut self, origin: RuleOrigin) -> Self {
        self.config.origin = origin;
        self
    }

    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uasniff_engine::DROP_PII_FIELD;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.fields, FieldSelection::All);
        assert_eq!(config.cache_capacity, 10_000);
        assert_eq!(config.max_length, 2048);
        assert!(!config.drop_pii);
        assert!(config.pii_safe_fields.contains("DeviceClass"));
        assert_eq!(config.origin, RuleOrigin::Embedded);
    }

    #[test]
    fn test_with_field_switches_to_explicit_list() {
        let config = AnalyzerConfig::builder()
            .with_all_fields()
            .with_field("DeviceClass")
            .with_fields(["AgentNameVersionMajor", DROP_PII_FIELD])
            .without_cache()
            .build();
        assert_eq!(
            config.fields,
            FieldSelection::Only(vec![
                RequestedField::Field("DeviceClass".into()),
                RequestedField::Field("AgentNameVersionMajor".into()),
                RequestedField::DropPii,
            ])
        );
        assert_eq!(config.cache_capacity, 0);
    }

    #[test]
    fn test_with_all_fields_resets_list() {
        let config = AnalyzerConfig::builder()
            .with_field("DeviceClass")
            .with_all_fields()
            .pii_safe_fields(["DeviceClass"])
            .max_length(64)
            .build();
        assert_eq!(config.fields, FieldSelection::All);
        assert_eq!(config.pii_safe_fields.len(), 1);
        assert_eq!(config.max_length, 64);
    }
}
