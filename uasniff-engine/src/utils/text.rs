//! 文本辅助：ASCII小写化、日志预览
use std::fmt;

/// ASCII 小写化（非ASCII字节原样保留，字节偏移与原文一致）
#[inline(always)]
pub fn safe_lowercase(s: &str) -> String {
    s.to_ascii_lowercase()
}

/// 日志用的 User-Agent 预览：连续空白折叠为一个空格，控制字符替换为 `?`，
/// 超过 limit 个字符时截断并追加 `…`。格式化时按需输出，不分配新字符串
pub struct LogPreview<'a> {
    text: &'a str,
    limit: usize,
}

impl fmt::Display for LogPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut written = 0usize;
        for (i, word) in self.text.split_whitespace().enumerate() {
            if i > 0 {
                if written >= self.limit {
                    return f.write_str("…");
                }
                f.write_str(" ")?;
                written += 1;
            }
            for ch in word.chars() {
                if written >= self.limit {
                    return f.write_str("…");
                }
                let ch = if ch.is_control() { '?' } else { ch };
                fmt::Write::write_char(f, ch)?;
                written += 1;
            }
        }
        Ok(())
    }
}

#[inline(always)]
pub fn preview_compact(text: &str, limit: usize) -> LogPreview<'_> {
    LogPreview { text, limit }
}
