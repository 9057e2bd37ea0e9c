//! uasniff-engine 内核错误定义
//! 封装内核层所有构建期错误，与业务层错误解耦，基于thiserror实现类型安全处理
//! 注意：解析期（parse）从不返回错误，畸形输入通过 __SyntaxError__ 字段标记
use thiserror::Error;

/// 内核核心错误枚举
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ===================== 规则相关错误 =====================
    /// 规则加载失败（规则数据反序列化错误）
    #[error("Rule load failed: {0}")]
    RuleLoad(String),

    /// 规则定义错误（编译期一次性收集全部问题，按 "; " 拼接输出）
    #[error("Invalid rule definitions: {}", .0.join("; "))]
    RuleDefinition(Vec<String>),

    // ===================== 字段配置错误 =====================
    /// 请求了无法提供的字段（不存在，或开启PII过滤时属于非安全字段）
    /// 名称已排序去重，一次性全部报告
    #[error("We cannot provide these fields:[{}]", .0.join(", "))]
    UnknownFields(Vec<String>),
}

impl CoreError {
    /// 构建字段错误（自动排序去重，保证输出确定性）
    pub fn unknown_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort_unstable();
        names.dedup();
        CoreError::UnknownFields(names)
    }
}

/// 内核层全局Result类型别名
pub type CoreResult<T> = Result<T, CoreError>;
