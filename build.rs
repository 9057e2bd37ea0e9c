// build.rs
// 内置 User-Agent 规则库的构建期处理：
// 读取 build_config.json → 解析规则JSON → 完整编译一次（规则有误直接构建失败）
// → 紧凑序列化 + 可选LZ4压缩 → 写入 OUT_DIR，由 src/rule/builtin.rs 通过 include_bytes! 固化
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use uasniff_engine::{CompiledRuleSet, RuleLibrary};

type BuildResult<T> = Result<T, Box<dyn Error>>;

/// 构建期配置
#[derive(Debug, Deserialize)]
struct EmbedConfig {
    /// 规则JSON路径（相对 crate 根目录）
    rules_json_path: PathBuf,
    /// OUT_DIR 下的产物文件名
    embedded_rules_output_name: String,
    /// 是否LZ4压缩（size-prepended）
    enable_compress: bool,
}

fn main() -> BuildResult<()> {
    if std::env::var_os("CARGO_FEATURE_EMBEDDED_RULES").is_none() {
        return Ok(());
    }
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=build_config.json");

    let config: EmbedConfig = read_json(Path::new("build_config.json"))?;
    println!("cargo:rerun-if-changed={}", config.rules_json_path.display());

    let library = load_and_validate(&config.rules_json_path)?;
    let payload = encode(&library, config.enable_compress)?;

    let out_path = PathBuf::from(std::env::var("OUT_DIR")?).join(&config.embedded_rules_output_name);
    fs::write(&out_path, payload)
        .map_err(|e| format!("写入规则产物失败 [{}]: {}", out_path.display(), e))?;

    println!("cargo:rustc-env=EMBEDDED_RULES_FILENAME={}", config.embedded_rules_output_name);
    println!("cargo:rustc-env=EMBEDDED_RULES_COMPRESSED={}", config.enable_compress);
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> BuildResult<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("读取 [{}] 失败: {}", path.display(), e))?;
    Ok(serde_json::from_str(&text).map_err(|e| format!("解析 [{}] 失败: {}", path.display(), e))?)
}

/// 规则库必须能完整编译（模式、正则、依赖环等全部校验）
fn load_and_validate(path: &Path) -> BuildResult<RuleLibrary> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("读取规则文件 [{}] 失败: {}", path.display(), e))?;
    let library = RuleLibrary::from_json_str(&text)?;
    CompiledRuleSet::compile(&library)
        .map_err(|e| format!("内置规则校验失败 [{}]: {}", path.display(), e))?;
    Ok(library)
}

fn encode(library: &RuleLibrary, compress: bool) -> BuildResult<Vec<u8>> {
    let json = serde_json::to_vec(library)?;
    Ok(if compress {
        lz4_flex::compress_prepend_size(&json)
    } else {
        json
    })
}
