//! PII安全字段白名单
//! 开启PII过滤时，白名单外的字段一律回退为默认值（置信度-1）
use std::collections::BTreeSet;

/// 默认PII安全字段
/// 完整版本号、构建号等高区分度字段不在此列
pub const DEFAULT_PII_SAFE_FIELDS: &[&str] = &[
    "DeviceClass",
    "DeviceName",
    "DeviceBrand",
    "DeviceCpu",
    "DeviceCpuBits",
    "DeviceVersion",
    "OperatingSystemClass",
    "OperatingSystemName",
    "OperatingSystemVersion",
    "OperatingSystemNameVersion",
    "LayoutEngineClass",
    "LayoutEngineName",
    "LayoutEngineVersionMajor",
    "LayoutEngineNameVersionMajor",
    "AgentClass",
    "AgentName",
    "AgentVersionMajor",
    "AgentNameVersionMajor",
    "AgentLanguage",
    "AgentLanguageCode",
    "AgentInformationEmail",
    "AgentInformationUrl",
    "AgentSecurity",
    "WebviewAppName",
    "WebviewAppVersionMajor",
    "WebviewAppNameVersionMajor",
    "FacebookCarrier",
    "FacebookDeviceClass",
    "FacebookDeviceName",
    "FacebookDeviceVersion",
    "FacebookOperatingSystemName",
    "FacebookOperatingSystemVersion",
    "Anonymized",
    "HackerAttackVector",
    "HackerToolkit",
    "IECompatibilityVersionMajor",
    "IECompatibilityNameVersionMajor",
    "Carrier",
];

/// 默认白名单集合
pub fn default_pii_safe_fields() -> BTreeSet<String> {
    DEFAULT_PII_SAFE_FIELDS.iter().map(|f| f.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_fields_not_listed() {
        let safe = default_pii_safe_fields();
        assert_eq!(safe.len(), DEFAULT_PII_SAFE_FIELDS.len());
        for unsafe_field in [
            "AgentVersion",
            "AgentNameVersion",
            "LayoutEngineVersion",
            "LayoutEngineNameVersion",
            "OperatingSystemVersionBuild",
        ] {
            assert!(!safe.contains(unsafe_field), "{} must not be PII safe", unsafe_field);
        }
        assert!(safe.contains("AgentNameVersionMajor"));
    }
}
