//! 内置规则库
//! 构建期由 build.rs 校验、序列化（可选LZ4压缩）后写入 OUT_DIR，这里通过 include_bytes! 固化进二进制
//! 首次使用时解码一次，之后只读共享
use once_cell::sync::Lazy;
use uasniff_engine::RuleLibrary;

use crate::error::{SniffResult, UaSniffError};

const EMBEDDED_RULES_BYTES: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/", env!("EMBEDDED_RULES_FILENAME")));

const EMBEDDED_RULES_COMPRESSED: &str = env!("EMBEDDED_RULES_COMPRESSED");

static EMBEDDED_RULES: Lazy<Result<RuleLibrary, String>> = Lazy::new(|| {
    let library = decode(EMBEDDED_RULES_BYTES, EMBEDDED_RULES_COMPRESSED == "true")
        .map_err(|e| e.to_string());
    match &library {
        Ok(lib) => log::debug!(
            "内置规则库加载完成 | Fields: {} | Matchers: {} | Derived: {}",
            lib.fields.len(),
            lib.matchers.len(),
            lib.derived.len()
        ),
        Err(e) => log::error!("内置规则库解码失败: {}", e),
    }
    library
});

/// 内置规则库（只读引用）
pub fn embedded_rules() -> SniffResult<&'static RuleLibrary> {
    EMBEDDED_RULES
        .as_ref()
        .map_err(|e| UaSniffError::RuleLoad(e.clone()))
}

fn decode(bytes: &[u8], compressed: bool) -> SniffResult<RuleLibrary> {
    let json = if compressed {
        lz4_flex::decompress_size_prepended(bytes)
            .map_err(|e| UaSniffError::RuleLoad(format!("LZ4解压失败: {}", e)))?
    } else {
        bytes.to_vec()
    };
    Ok(serde_json::from_slice(&json)?)
}
