use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 未命中任何规则时的置信度（值为字段声明的默认值）
pub const UNRESOLVED_CONFIDENCE: i32 = -1;

/// 未显式声明默认值的字段使用的默认值
pub const DEFAULT_FIELD_VALUE: &str = "Unknown";

/// 系统字段：输入是否存在语法错误（超长/嵌套过深）
pub const SYNTAX_ERROR_FIELD: &str = "__SyntaxError__";

/// 系统字段：PII过滤请求标记，报告是否有非安全字段被屏蔽
pub const DROP_PII_FIELD: &str = "__DropPIIFields__";

/// 判断是否为系统字段（系统字段始终视为PII安全）
#[inline(always)]
pub fn is_system_field(name: &str) -> bool {
    name == SYNTAX_ERROR_FIELD || name == DROP_PII_FIELD
}

/// 单个字段的解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    pub confidence: i32,
    /// 值是否为默认值回退（未命中/被PII屏蔽/依赖未解析）
    pub defaulted: bool,
}

impl FieldValue {
    /// 规则命中的值
    pub fn resolved(value: impl Into<String>, confidence: i32) -> Self {
        Self {
            value: value.into(),
            confidence,
            defaulted: false,
        }
    }

    /// 默认值（置信度-1）
    pub fn default_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confidence: UNRESOLVED_CONFIDENCE,
            defaulted: true,
        }
    }

    #[inline(always)]
    pub fn is_resolved(&self) -> bool {
        self.confidence > UNRESOLVED_CONFIDENCE
    }
}

/// 匹配阶段产出的字段贡献（单次解析内有效，合并后即丢弃）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContribution {
    pub field: String,
    pub value: String,
    pub confidence: i32,
}

/// 请求字段：普通字段名 或 PII过滤哨兵
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestedField {
    Field(String),
    /// 请求PII过滤，同时在结果中报告是否有字段被屏蔽
    DropPii,
}

impl RequestedField {
    /// 结果中使用的字段名
    pub fn name(&self) -> &str {
        match self {
            RequestedField::Field(name) => name,
            RequestedField::DropPii => DROP_PII_FIELD,
        }
    }
}

impl From<&str> for RequestedField {
    fn from(name: &str) -> Self {
        let name = name.trim();
        if name == DROP_PII_FIELD {
            RequestedField::DropPii
        } else {
            RequestedField::Field(name.to_string())
        }
    }
}

impl From<String> for RequestedField {
    fn from(name: String) -> Self {
        RequestedField::from(name.as_str())
    }
}

impl Display for RequestedField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 字段选择：全部字段 或 指定列表
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldSelection {
    #[default]
    All,
    Only(Vec<RequestedField>),
}

impl FieldSelection {
    /// 是否包含PII过滤哨兵
    pub fn requests_drop_pii(&self) -> bool {
        match self {
            FieldSelection::All => false,
            FieldSelection::Only(fields) => fields.contains(&RequestedField::DropPii),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_field_from_sentinel_name() {
        assert_eq!(RequestedField::from(DROP_PII_FIELD), RequestedField::DropPii);
        assert_eq!(
            RequestedField::from(" DeviceClass "),
            RequestedField::Field("DeviceClass".into())
        );
        assert_eq!(RequestedField::DropPii.name(), DROP_PII_FIELD);
    }

    #[test]
    fn test_selection_drop_pii_flag() {
        assert!(!FieldSelection::All.requests_drop_pii());
        let only = FieldSelection::Only(vec!["DeviceClass".into(), RequestedField::DropPii]);
        assert!(only.requests_drop_pii());
    }
}
