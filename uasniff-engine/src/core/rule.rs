use serde::{Deserialize, Serialize};

use super::enums::NodeKind;
use super::field::DEFAULT_FIELD_VALUE;
use crate::error::{CoreError, CoreResult};

fn default_field_value() -> String {
    DEFAULT_FIELD_VALUE.to_string()
}

/// 核心规则库结构体，外部规则源解析后的统一结构
/// 规则即数据：新增规则无需改动引擎代码
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleLibrary {
    /// 基础字段声明（字段名 + 默认值）
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// 匹配规则（声明顺序即同置信度时的优先顺序）
    #[serde(default)]
    pub matchers: Vec<MatcherDefinition>,
    /// 派生字段（由其他已解析字段计算）
    #[serde(default)]
    pub derived: Vec<DerivedFieldDefinition>,
}

impl RuleLibrary {
    /// 从JSON文本加载规则库
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::RuleLoad(e.to_string()))
    }

    /// 合并另一个规则库（追加到末尾，保持声明顺序）
    pub fn extend(&mut self, other: RuleLibrary) {
        self.fields.extend(other.fields);
        self.matchers.extend(other.matchers);
        self.derived.extend(other.derived);
    }
}

/// 基础字段声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default = "default_field_value")]
    pub default_value: String,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
        }
    }
}

/// 单条匹配规则定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherDefinition {
    /// 目标字段
    pub field: String,
    /// 置信度（越高越优先，必须≥0）
    pub confidence: i32,
    pub pattern: PatternDefinition,
    pub value: ValueDefinition,
}

impl MatcherDefinition {
    pub fn new(
        field: impl Into<String>,
        confidence: i32,
        pattern: PatternDefinition,
        value: ValueDefinition,
    ) -> Self {
        Self {
            field: field.into(),
            confidence,
            pattern,
            value,
        }
    }
}

/// 原始模式定义（kind 为字符串，编译期映射为封闭的模式枚举）
/// 支持的 kind：
/// - exact_product(name)
/// - product_version_at_least(name, version)
/// - comment_contains(substring)
/// - key_value_equals(key, value)
/// - field_equals(field, value)
/// - all_of(of) / any_of(of)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub of: Vec<PatternDefinition>,
}

impl PatternDefinition {
    pub fn exact_product(name: impl Into<String>) -> Self {
        Self {
            kind: "exact_product".into(),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn product_version_at_least(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: "product_version_at_least".into(),
            name: Some(name.into()),
            version: Some(version.into()),
            ..Self::default()
        }
    }

    pub fn comment_contains(substring: impl Into<String>) -> Self {
        Self {
            kind: "comment_contains".into(),
            substring: Some(substring.into()),
            ..Self::default()
        }
    }

    pub fn key_value_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: "key_value_equals".into(),
            key: Some(key.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: "field_equals".into(),
            field: Some(field.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn all_of(of: Vec<PatternDefinition>) -> Self {
        Self {
            kind: "all_of".into(),
            of,
            ..Self::default()
        }
    }

    pub fn any_of(of: Vec<PatternDefinition>) -> Self {
        Self {
            kind: "any_of".into(),
            of,
            ..Self::default()
        }
    }
}

/// 值提取来源（作用于被定位的节点）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ExtractSource {
    /// 节点文本
    #[default]
    Text,
    /// 节点下第一个版本号
    Version,
    /// KeyValue 节点的值
    Value,
    /// 节点文本按空白切分后的第 index 个单词（0起）
    Word { index: usize },
    /// 正则 + 模板（支持 $1 / \1 分组引用）
    Regex { pattern: String, template: String },
}

/// 值变换
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transform {
    #[default]
    None,
    /// 仅保留主版本号（53.0.2785.124 → 53）
    MajorVersion,
    /// 保留前 parts 段版本号（parts=2：53.0.2785.124 → 53.0）
    Truncate { parts: usize },
    /// 下划线版本号规范化（10_3_1 → 10.3.1）
    CleanVersion,
}

/// 值表达式定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueDefinition {
    /// 字面量
    Literal { value: String },
    /// 从模式命中（绑定）的节点提取
    Bound {
        #[serde(default)]
        source: ExtractSource,
        #[serde(default)]
        transform: Transform,
    },
    /// 从路径命中的第一个节点提取，路径形如 product[0]/version[0]
    Path {
        path: String,
        #[serde(default)]
        source: ExtractSource,
        #[serde(default)]
        transform: Transform,
    },
    /// 指定类型的第 n 个节点文本（0起）
    Nth {
        node: NodeKind,
        n: usize,
        #[serde(default)]
        transform: Transform,
    },
    /// 复制另一个基础字段的值
    Field {
        name: String,
        #[serde(default)]
        transform: Transform,
    },
}

impl ValueDefinition {
    pub fn literal(value: impl Into<String>) -> Self {
        ValueDefinition::Literal { value: value.into() }
    }

    pub fn bound(source: ExtractSource, transform: Transform) -> Self {
        ValueDefinition::Bound { source, transform }
    }

    pub fn bound_text() -> Self {
        Self::bound(ExtractSource::Text, Transform::None)
    }

    pub fn bound_version() -> Self {
        Self::bound(ExtractSource::Version, Transform::None)
    }

    pub fn bound_regex(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self::bound(
            ExtractSource::Regex {
                pattern: pattern.into(),
                template: template.into(),
            },
            Transform::None,
        )
    }
}

/// 派生字段定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFieldDefinition {
    pub name: String,
    #[serde(default = "default_field_value")]
    pub default_value: String,
    pub derivation: Derivation,
}

impl DerivedFieldDefinition {
    pub fn new(name: impl Into<String>, default_value: impl Into<String>, derivation: Derivation) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
            derivation,
        }
    }
}

/// 派生计算方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// 按顺序拼接依赖字段值
    Concat {
        fields: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// 依赖字段的主版本号
    MajorVersion { field: String },
}

fn default_separator() -> String {
    " ".to_string()
}

impl Derivation {
    pub fn concat(fields: &[&str]) -> Self {
        Derivation::Concat {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            separator: default_separator(),
        }
    }

    pub fn major_version(field: impl Into<String>) -> Self {
        Derivation::MajorVersion { field: field.into() }
    }

    /// 依赖字段列表（声明顺序）
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            Derivation::Concat { fields, .. } => fields.iter().map(String::as_str).collect(),
            Derivation::MajorVersion { field } => vec![field.as_str()],
        }
    }
}
