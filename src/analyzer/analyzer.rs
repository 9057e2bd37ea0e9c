//! User-Agent 解析器：整合规则集、解析计划与结果缓存
//!
//! 构建期一次性完成规则编译、字段校验与依赖闭包计算；之后只读，可在线程间共享。
//! 解析流程：缓存查找 → 分词 → 树索引 → 规则匹配 → 字段解析 → 写入缓存
use std::collections::BTreeSet;
use std::sync::Arc;

use uasniff_engine::utils::preview_compact;
use uasniff_engine::{
    evaluate_fields, resolve, tokenize, CompiledRuleSet, FieldSelection, ParseResult,
    ResolvePlan, RuleLibrary, TreeIndex,
};

use crate::cache::ResultCache;
use crate::config::AnalyzerConfig;
use crate::error::{SniffResult, UaSniffError};
use crate::rule::RuleLoader;

/// 日志中 User-Agent 预览的最大字符数
const LOG_PREVIEW_LEN: usize = 120;

/// User-Agent 解析器
pub struct UserAgentAnalyzer {
    rules: CompiledRuleSet,
    plan: ResolvePlan,
    cache: ResultCache,
    max_length: usize,
}

impl UserAgentAnalyzer {
    /// 按配置中的规则来源创建解析器
    pub fn new(config: AnalyzerConfig) -> SniffResult<Self> {
        let library = RuleLoader::load(&config.origin)?;
        Self::build(&library, config)
    }

    /// 使用内置规则库创建解析器（忽略配置中的规则来源）
    #[cfg(feature = "embedded-rules")]
    pub fn with_embedded_rules(config: AnalyzerConfig) -> SniffResult<Self> {
        let library = crate::rule::embedded_rules()?;
        Self::build(library, config)
    }

    /// 使用调用方提供的规则库创建解析器
    pub fn build(library: &RuleLibrary, config: AnalyzerConfig) -> SniffResult<Self> {
        if config.max_length == 0 {
            return Err(UaSniffError::InvalidConfig(
                "max_length 必须大于0".to_string(),
            ));
        }

        let rules = CompiledRuleSet::compile(library)?;
        let plan = ResolvePlan::new(
            &rules,
            &config.fields,
            &config.pii_safe_fields,
            config.drop_pii,
        )?;
        let cache = ResultCache::new(config.cache_capacity);

        log::info!(
            "UserAgentAnalyzer 初始化完成 | Fields: {} | Matchers: {} | Drop PII: {} | Cache: {} | Max Length: {}",
            plan.requested_fields().len(),
            rules.matcher_count(),
            plan.drop_pii(),
            config.cache_capacity,
            config.max_length
        );

        Ok(Self {
            rules,
            plan,
            cache,
            max_length: config.max_length,
        })
    }

    /// 解析单条 User-Agent（带缓存），从不失败
    pub fn parse(&self, user_agent: &str) -> Arc<ParseResult> {
        self.cache
            .get_or_compute(user_agent, || self.parse_uncached(user_agent))
    }

    /// 绕过缓存直接解析
    pub fn parse_uncached(&self, user_agent: &str) -> ParseResult {
        // 语法错误的输入不执行规则：全部字段回退默认值
        let (contributions, syntax_error) = match tokenize(user_agent, self.max_length) {
            Ok(tree) => {
                let index = TreeIndex::new(&tree);
                (evaluate_fields(&index, &self.rules, self.plan.primitive_fields()), false)
            }
            Err(err) => {
                log::debug!(
                    "User-Agent 语法错误: {} | Input: {}",
                    err,
                    preview_compact(user_agent, LOG_PREVIEW_LEN)
                );
                (Vec::new(), true)
            }
        };
        resolve(user_agent, contributions, &self.rules, &self.plan, syntax_error)
    }

    /// 输入最大长度（字节）
    pub fn user_agent_max_length(&self) -> usize {
        self.max_length
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn cache_len(&self) -> u64 {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// 结果中投影的字段（已排序）
    pub fn requested_fields(&self) -> &[String] {
        self.plan.requested_fields()
    }

    /// 解析器能够提供的全部字段（已排序，开启PII过滤时不含非安全字段）
    pub fn all_possible_field_names(&self) -> Vec<&str> {
        self.rules
            .all_fields()
            .into_iter()
            .filter(|name| !self.plan.drop_pii() || self.plan.is_pii_safe(name))
            .collect()
    }

    pub fn rules(&self) -> &CompiledRuleSet {
        &self.rules
    }
}

impl std::fmt::Debug for UserAgentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAgentAnalyzer")
            .field("requested", &self.plan.requested_fields())
            .field("drop_pii", &self.plan.drop_pii())
            .field("max_length", &self.max_length)
            .field("cache", &self.cache)
            .finish()
    }
}

/// 一次性构建解析器
pub fn build_engine<I, S>(
    rule_definitions: &RuleLibrary,
    requested_fields: FieldSelection,
    pii_safe_allowlist: I,
    drop_pii: bool,
    cache_capacity: usize,
    max_input_length: usize,
) -> SniffResult<UserAgentAnalyzer>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let config = AnalyzerConfig {
        fields: requested_fields,
        drop_pii,
        pii_safe_fields: pii_safe_allowlist
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<String>>(),
        cache_capacity,
        max_length: max_input_length,
        ..AnalyzerConfig::default()
    };
    UserAgentAnalyzer::build(rule_definitions, config)
}


#[cfg(all(test, feature = "embedded-rules"))]
mod embedded_tests {
    use super::*;
    use crate::config::RuleOrigin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uasniff_engine::{DROP_PII_FIELD, SYNTAX_ERROR_FIELD};

    const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 7.0; Nexus 6 Build/NBD90Z) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/53.0.2785.124 Mobile Safari/537.36";
    const LINUX_CHROME: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/48.0.2564.82 Safari/537.36";
    const IE11: &str = "Mozilla/5.0 (Windows NT 10.0; Trident/7.0; rv:11.0) like Gecko";
    const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    fn analyzer(config: AnalyzerConfig) -> UserAgentAnalyzer {
        UserAgentAnalyzer::with_embedded_rules(config).unwrap()
    }

    #[test]
    fn test_requested_fields_with_internal_dependency() {
        let analyzer = analyzer(
            AnalyzerConfig::builder()
                .with_fields(["DeviceClass", "AgentNameVersionMajor"])
                .build(),
        );
        let result = analyzer.parse(ANDROID_CHROME);
        assert_eq!(result.value("DeviceClass"), "Phone");
        assert_eq!(result.value("AgentNameVersionMajor"), "Chrome 53");
        assert_eq!(result.value("AgentName"), "Chrome");
        assert!(result.confidence("AgentName") >= 0);
        assert_eq!(result.confidence("DeviceName"), -1);
        assert_eq!(result.value("DeviceName"), "Unknown");
        assert_eq!(
            result.field_names().collect::<Vec<_>>(),
            vec!["AgentNameVersionMajor", "DeviceClass"]
        );
    }

    #[test]
    fn test_drop_pii_with_all_fields() {
        let analyzer = analyzer(AnalyzerConfig::builder().drop_pii_fields(true).build());
        let result = analyzer.parse(ANDROID_CHROME);

        assert_eq!(result.value("AgentVersion"), "??");
        assert_eq!(result.confidence("AgentVersion"), -1);
        assert_eq!(result.value("AgentNameVersion"), "Unknown");
        assert_eq!(result.confidence("AgentNameVersion"), -1);
        assert_eq!(result.confidence("LayoutEngineVersion"), -1);
        assert_eq!(result.confidence("OperatingSystemVersionBuild"), -1);

        assert_eq!(result.value("AgentNameVersionMajor"), "Chrome 53");
        assert_eq!(result.value("AgentVersionMajor"), "53");
        assert_eq!(result.value("DeviceClass"), "Phone");
        assert_eq!(result.value("DeviceName"), "Google Nexus 6");
        assert_eq!(result.value("OperatingSystemNameVersion"), "Android 7.0");
        assert_eq!(result.value("LayoutEngineNameVersionMajor"), "Blink 53");

        assert_eq!(result.value(DROP_PII_FIELD), "true");
        assert_eq!(result.confidence(DROP_PII_FIELD), 0);
        assert!(!result.has_syntax_error());
    }

    #[test]
    fn test_all_fields_without_drop_pii() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let result = analyzer.parse(ANDROID_CHROME);
        assert_eq!(result.value("AgentVersion"), "53.0.2785.124");
        assert_eq!(result.value("AgentNameVersion"), "Chrome 53.0.2785.124");
        assert_eq!(result.value("LayoutEngineVersion"), "53.0");
        assert_eq!(result.value("OperatingSystemVersionBuild"), "NBD90Z");
        assert_eq!(result.value("DeviceBrand"), "Google");
        assert!(result.get(SYNTAX_ERROR_FIELD).is_some());
        assert!(result.get(DROP_PII_FIELD).is_none());
    }

    #[test]
    fn test_unknown_fields_reported_together() {
        let err = UserAgentAnalyzer::with_embedded_rules(
            AnalyzerConfig::builder()
                .with_fields(["SecondNonexistentField", "DeviceClass", "FirstNonexistentField"])
                .build(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "We cannot provide these fields:[FirstNonexistentField, SecondNonexistentField]"
        );
    }

    #[test]
    fn test_unrequested_dependency_not_projected() {
        let analyzer = analyzer(AnalyzerConfig::builder().with_field("DeviceClass").build());
        let result = analyzer.parse(ANDROID_CHROME);
        assert_eq!(result.field_names().collect::<Vec<_>>(), vec!["DeviceClass"]);
        assert!(result.get("AgentName").is_none());
        assert_eq!(result.value("AgentName"), "Chrome");
        assert_eq!(analyzer.requested_fields(), ["DeviceClass".to_string()]);
    }

    #[test]
    fn test_explicit_unsafe_field_with_drop_pii() {
        let err = UserAgentAnalyzer::with_embedded_rules(
            AnalyzerConfig::builder()
                .with_fields(["AgentNameVersion", "DeviceClass"])
                .drop_pii_fields(true)
                .build(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "We cannot provide these fields:[AgentNameVersion]");

        let err = UserAgentAnalyzer::with_embedded_rules(
            AnalyzerConfig::builder()
                .with_fields(["AgentVersion", DROP_PII_FIELD])
                .build(),
        )
        .unwrap_err();
        assert_eq!(err.unknown_fields(), Some(&["AgentVersion".to_string()][..]));
    }

    #[test]
    fn test_drop_pii_sentinel_reports_false_when_nothing_suppressed() {
        let analyzer = analyzer(
            AnalyzerConfig::builder()
                .with_fields(["DeviceClass", DROP_PII_FIELD])
                .build(),
        );
        let result = analyzer.parse(ANDROID_CHROME);
        assert_eq!(result.value("DeviceClass"), "Phone");
        assert_eq!(result.value(DROP_PII_FIELD), "false");
        assert_eq!(result.confidence(DROP_PII_FIELD), -1);
    }

    #[test]
    fn test_drop_pii_sentinel_alone_selects_all_safe_fields() {
        let analyzer = analyzer(
            AnalyzerConfig::builder()
                .with_all_fields()
                .with_field(DROP_PII_FIELD)
                .build(),
        );
        let result = analyzer.parse(ANDROID_CHROME);

        assert_eq!(result.value("DeviceClass"), "Phone");
        assert_eq!(result.value("DeviceName"), "Google Nexus 6");
        assert_eq!(result.value("DeviceBrand"), "Google");
        assert_eq!(result.value("OperatingSystemNameVersion"), "Android 7.0");
        assert_eq!(result.value("LayoutEngineNameVersionMajor"), "Blink 53");
        assert_eq!(result.value("AgentName"), "Chrome");
        assert_eq!(result.value("AgentVersionMajor"), "53");
        assert_eq!(result.value("AgentNameVersionMajor"), "Chrome 53");
        assert_eq!(result.value(DROP_PII_FIELD), "true");

        let names: Vec<&str> = result.field_names().collect();
        for unsafe_field in [
            "AgentVersion",
            "AgentNameVersion",
            "LayoutEngineVersion",
            "OperatingSystemVersionBuild",
        ] {
            assert!(!names.contains(&unsafe_field), "{} must not be projected", unsafe_field);
        }
        assert!(names.contains(&DROP_PII_FIELD));
        assert!(names.contains(&SYNTAX_ERROR_FIELD));
    }

    #[test]
    fn test_projection_matches_full_parse() {
        let subset = analyzer(
            AnalyzerConfig::builder()
                .with_fields(["DeviceClass", "AgentNameVersionMajor"])
                .build(),
        );
        let full = analyzer(AnalyzerConfig::default());
        for ua in [ANDROID_CHROME, LINUX_CHROME, IE11, GOOGLEBOT] {
            let a = subset.parse(ua);
            let b = full.parse(ua);
            for field in ["DeviceClass", "AgentNameVersionMajor"] {
                assert_eq!(a.get(field), b.get(field), "{} differs for {}", field, ua);
            }
        }
    }

    #[test]
    fn test_desktop_chrome() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let result = analyzer.parse(LINUX_CHROME);
        assert_eq!(result.value("DeviceClass"), "Desktop");
        assert_eq!(result.value("DeviceName"), "Desktop");
        assert_eq!(result.value("AgentNameVersionMajor"), "Chrome 48");
        assert_eq!(result.value("OperatingSystemName"), "Linux");
        assert_eq!(result.value("OperatingSystemNameVersion"), "Unknown");
        assert_eq!(result.value("LayoutEngineName"), "Blink");
    }

    #[test]
    fn test_internet_explorer() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let result = analyzer.parse(IE11);
        assert_eq!(result.value("AgentName"), "Internet Explorer");
        assert_eq!(result.value("AgentVersion"), "11.0");
        assert_eq!(result.value("AgentNameVersionMajor"), "Internet Explorer 11");
        assert_eq!(result.value("OperatingSystemNameVersion"), "Windows NT 10.0");
        assert_eq!(result.value("LayoutEngineNameVersion"), "Trident 7.0");
        assert_eq!(result.value("DeviceClass"), "Desktop");
    }

    #[test]
    fn test_googlebot() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let result = analyzer.parse(GOOGLEBOT);
        assert_eq!(result.value("AgentName"), "Googlebot");
        assert_eq!(result.value("AgentVersion"), "2.1");
        assert_eq!(result.value("AgentClass"), "Robot");
        assert_eq!(result.value("DeviceClass"), "Robot");
        assert_eq!(result.confidence("DeviceClass"), 150);
        assert_eq!(result.value("AgentInformationUrl"), "http://www.google.com/bot.html");
    }

    #[test]
    fn test_empty_input() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let result = analyzer.parse("");
        assert!(!result.has_syntax_error());
        assert_eq!(result.value("DeviceClass"), "Unknown");
        assert_eq!(result.confidence("DeviceClass"), -1);
        assert!(result.is_default("AgentNameVersionMajor"));
    }

    #[test]
    fn test_too_long_input_flagged() {
        let analyzer = analyzer(AnalyzerConfig::builder().max_length(24).build());
        let result = analyzer.parse(ANDROID_CHROME);
        assert!(result.has_syntax_error());
        assert_eq!(result.value(SYNTAX_ERROR_FIELD), "true");
        assert_eq!(result.value("OperatingSystemName"), "Unknown");
        assert_eq!(result.confidence("OperatingSystemName"), -1);
        assert_eq!(result.user_agent(), ANDROID_CHROME);
    }

    #[test]
    fn test_too_long_input_discards_partial_matches() {
        // 截断点落在 Chrome 版本号中间，残缺的版本号不得输出
        let analyzer = analyzer(AnalyzerConfig::builder().max_length(108).build());
        let result = analyzer.parse(ANDROID_CHROME);
        assert!(result.has_syntax_error());
        assert_eq!(result.value("AgentVersion"), "??");
        assert_eq!(result.confidence("AgentVersion"), -1);
        assert_eq!(result.value("AgentNameVersion"), "Unknown");
        assert_eq!(result.confidence("AgentNameVersion"), -1);
        for (name, value) in result.iter().filter(|(name, _)| *name != SYNTAX_ERROR_FIELD) {
            assert_eq!(value.confidence, -1, "{} must fall back to its default", name);
        }
    }

    #[test]
    fn test_deterministic_with_and_without_cache() {
        let cached = analyzer(AnalyzerConfig::default());
        let uncached = analyzer(AnalyzerConfig::builder().without_cache().build());
        for ua in [ANDROID_CHROME, LINUX_CHROME, IE11, GOOGLEBOT, "", "((((("] {
            let a = cached.parse(ua);
            let b = uncached.parse(ua);
            assert_eq!(*a, *b);
            assert_eq!(*a, cached.parse_uncached(ua));
            assert_eq!(
                serde_json::to_string(&*a).unwrap(),
                serde_json::to_string(&*cached.parse(ua)).unwrap()
            );
        }
    }

    #[test]
    fn test_cache_reuses_result() {
        let analyzer = analyzer(AnalyzerConfig::builder().cache_capacity(8).build());
        let first = analyzer.parse(LINUX_CHROME);
        let second = analyzer.parse(LINUX_CHROME);
        assert!(Arc::ptr_eq(&first, &second));
        analyzer.clear_cache();
        let third = analyzer.parse(LINUX_CHROME);
        assert_eq!(*first, *third);
    }

    #[test]
    fn test_concurrent_parsing() {
        let analyzer = Arc::new(analyzer(AnalyzerConfig::default()));
        let matches = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let analyzer = Arc::clone(&analyzer);
                let matches = Arc::clone(&matches);
                std::thread::spawn(move || {
                    let ua = if i % 2 == 0 { ANDROID_CHROME } else { LINUX_CHROME };
                    for _ in 0..50 {
                        let result = analyzer.parse(ua);
                        let expected = if i % 2 == 0 { "Chrome 53" } else { "Chrome 48" };
                        if result.value("AgentNameVersionMajor") == expected {
                            matches.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(matches.load(Ordering::SeqCst), 8 * 50);
    }

    #[test]
    fn test_all_possible_field_names() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let names = analyzer.all_possible_field_names();
        assert!(names.contains(&"AgentVersion"));
        assert!(names.windows(2).all(|w| w[0] < w[1]));

        let analyzer = self::analyzer(AnalyzerConfig::builder().drop_pii_fields(true).build());
        let names = analyzer.all_possible_field_names();
        assert!(!names.contains(&"AgentVersion"));
        assert!(names.contains(&"AgentVersionMajor"));
    }

    #[test]
    fn test_new_with_local_rule_file() {
        let path = std::env::temp_dir().join(format!("uasniff-analyzer-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"matchers":[{"field":"AgentName","confidence":5,
               "pattern":{"kind":"exact_product","name":"Wget"},"value":{"kind":"bound"}}]}"#,
        )
        .unwrap();
        let analyzer = UserAgentAnalyzer::new(
            AnalyzerConfig::builder()
                .origin(RuleOrigin::LocalFile(path.clone()))
                .pii_safe_fields(["AgentName"])
                .build(),
        );
        let _ = std::fs::remove_file(&path);
        let analyzer = analyzer.unwrap();
        let result = analyzer.parse("Wget/1.21.4");
        assert_eq!(result.value("AgentName"), "Wget");
        assert_eq!(result.confidence("AgentName"), 5);
        assert!(result.get("DeviceClass").is_none());

        let embedded = UserAgentAnalyzer::new(AnalyzerConfig::default()).unwrap();
        assert_eq!(embedded.parse(LINUX_CHROME).value("DeviceClass"), "Desktop");
    }
}
