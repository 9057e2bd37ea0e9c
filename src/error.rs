//! 全局错误类型定义

use std::io::Error as IoError;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use uasniff_engine::CoreError;

#[derive(Error, Debug)]
pub enum UaSniffError {
    // 引擎错误（规则定义 / 未知字段）
    #[error(transparent)]
    Core(#[from] CoreError),

    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoad(String),

    // 配置错误
    #[error("无效配置：{0}")]
    InvalidConfig(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    Json(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    Io(#[from] IoError),
}

impl UaSniffError {
    /// 未知字段列表（仅 UnknownFields 错误）
    pub fn unknown_fields(&self) -> Option<&[String]> {
        match self {
            UaSniffError::Core(CoreError::UnknownFields(fields)) => Some(fields),
            _ => None,
        }
    }
}

// 全局Result类型
pub type SniffResult<T> = Result<T, UaSniffError>;
