//! uasniff 命令行工具
//!
//! 从参数或标准输入（每行一条）读取 User-Agent，逐条输出一行JSON
//!
//! ```bash
//! uasniff --field DeviceClass --field AgentNameVersionMajor "Mozilla/5.0 (X11; Linux x86_64) ..."
//! cat access_ua.txt | uasniff --drop-pii
//! ```
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use uasniff::{AnalyzerConfig, RuleOrigin, SniffResult, UserAgentAnalyzer, DEFAULT_MAX_LENGTH};

/// 规则驱动的 User-Agent 解析工具
#[derive(Parser, Debug)]
#[command(name = "uasniff", version)]
struct Args {
    /// 请求字段（可重复），不指定时输出全部字段
    #[arg(long = "field", short = 'f', value_name = "NAME")]
    fields: Vec<String>,

    /// 屏蔽非PII安全字段
    #[arg(long)]
    drop_pii: bool,

    /// 结果缓存容量，0 关闭缓存
    #[arg(long, default_value_t = uasniff::DEFAULT_CACHE_CAPACITY)]
    cache_size: usize,

    /// 输入最大长度（字节）
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// 使用本地JSON规则文件替换内置规则
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// 待解析的 User-Agent，为空时从标准输入读取
    user_agents: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("uasniff: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> SniffResult<()> {
    let mut builder = AnalyzerConfig::builder()
        .drop_pii_fields(args.drop_pii)
        .cache_capacity(args.cache_size)
        .max_length(args.max_length);
    if !args.fields.is_empty() {
        builder = builder.with_fields(args.fields);
    }
    if let Some(path) = args.rules {
        builder = builder.origin(RuleOrigin::LocalFile(path));
    }
    let analyzer = UserAgentAnalyzer::new(builder.build())?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.user_agents.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line?;
            let user_agent = line.trim_end_matches('\r');
            if user_agent.is_empty() {
                continue;
            }
            emit(&analyzer, user_agent, &mut out)?;
        }
    } else {
        for user_agent in &args.user_agents {
            emit(&analyzer, user_agent, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn emit(analyzer: &UserAgentAnalyzer, user_agent: &str, out: &mut impl Write) -> SniffResult<()> {
    let result = analyzer.parse(user_agent);
    serde_json::to_writer(&mut *out, &*result)?;
    out.write_all(b"\n")?;
    Ok(())
}
