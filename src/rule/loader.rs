//! 规则加载：按 RuleOrigin 选择内置规则或本地JSON规则文件
use std::path::Path;

use uasniff_engine::RuleLibrary;

use crate::config::RuleOrigin;
use crate::error::SniffResult;

/// 规则加载器
pub struct RuleLoader;

impl RuleLoader {
    /// 按来源加载规则库
    pub fn load(origin: &RuleOrigin) -> SniffResult<RuleLibrary> {
        match origin {
            RuleOrigin::Embedded => Self::load_embedded(),
            RuleOrigin::LocalFile(path) => Self::load_local_file(path),
        }
    }

    /// 读取本地JSON规则文件
    pub fn load_local_file(path: &Path) -> SniffResult<RuleLibrary> {
        let content = std::fs::read_to_string(path)?;
        let library: RuleLibrary = serde_json::from_str(&content)?;
        log::debug!(
            "本地规则文件加载成功 | Path: {} | Matchers: {}",
            path.display(),
            library.matchers.len()
        );
        Ok(library)
    }

    #[cfg(feature = "embedded-rules")]
    fn load_embedded() -> SniffResult<RuleLibrary> {
        super::builtin::embedded_rules().cloned()
    }

    #[cfg(not(feature = "embedded-rules"))]
    fn load_embedded() -> SniffResult<RuleLibrary> {
        Err(crate::error::UaSniffError::InvalidConfig(
            "内置规则未启用（需要 embedded-rules feature）".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UaSniffError;

    #[test]
    fn test_load_missing_local_file() {
        let path = std::env::temp_dir().join("uasniff-missing-rules-file.json");
        let err = RuleLoader::load(&RuleOrigin::LocalFile(path)).unwrap_err();
        assert!(matches!(err, UaSniffError::Io(_)));
    }

    #[test]
    fn test_load_local_file() {
        let path = std::env::temp_dir().join(format!("uasniff-rules-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"fields":[{"name":"AgentName"}],"matchers":[{"field":"AgentName","confidence":10,
               "pattern":{"kind":"exact_product","name":"curl"},"value":{"kind":"bound"}}]}"#,
        )
        .unwrap();
        let library = RuleLoader::load(&RuleOrigin::LocalFile(path.clone())).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(library.matchers.len(), 1);
        assert_eq!(library.matchers[0].field, "AgentName");
    }

    #[test]
    fn test_load_invalid_local_file() {
        let path = std::env::temp_dir().join(format!("uasniff-bad-rules-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = RuleLoader::load(&RuleOrigin::LocalFile(path.clone())).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, UaSniffError::Json(_)));
    }
}
