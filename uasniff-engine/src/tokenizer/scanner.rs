//! User-Agent 分词器
//! 单次从左到右扫描，识别三类结构分隔：
//! 1. 括号注释块 `( ... )`，可嵌套
//! 2. 斜杠分隔的产品/版本 `Name/Version`
//! 3. 注释内部以 `;` `,` 分隔的条目
//! 容错优先：真实世界的 User-Agent 经常畸形，扫描器总是产出尽力而为的语法树

use thiserror::Error;

use crate::core::{NodeId, NodeKind, SyntaxTree};

/// 默认最大输入长度（字节）
pub const DEFAULT_MAX_LENGTH: usize = 2048;

/// 注释最大嵌套深度，更深的内容折叠进条目文本
pub const MAX_COMMENT_DEPTH: usize = 8;

/// 语法错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("input length {length} exceeds maximum {max_length}, truncated")]
    TooLong { length: usize, max_length: usize },
    #[error("comment nesting deeper than {max_depth} levels")]
    NestingTooDeep { max_depth: usize },
}

/// 语法错误：携带尽力而为构建出的语法树，调用方仍可继续匹配
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("user agent syntax error: {kind}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub partial: SyntaxTree,
}

impl SyntaxError {
    /// 取出尽力而为的语法树
    pub fn into_partial(self) -> SyntaxTree {
        self.partial
    }
}

/// 分词入口
/// - 超过 max_length 的输入先截断（字符边界对齐）再分词，并返回 TooLong
/// - 注释嵌套过深返回 NestingTooDeep
/// - 其余畸形输入（未闭合注释、多余右括号等）静默修复
pub fn tokenize(raw: &str, max_length: usize) -> Result<SyntaxTree, SyntaxError> {
    let (input, truncated) = truncate_at_boundary(raw, max_length);

    let mut scanner = Scanner::default();
    scanner.sequence(input, SyntaxTree::ROOT, 0);
    let Scanner { tree, too_deep } = scanner;

    if truncated {
        Err(SyntaxError {
            kind: SyntaxErrorKind::TooLong {
                length: raw.len(),
                max_length,
            },
            partial: tree,
        })
    } else if too_deep {
        Err(SyntaxError {
            kind: SyntaxErrorKind::NestingTooDeep {
                max_depth: MAX_COMMENT_DEPTH,
            },
            partial: tree,
        })
    } else {
        Ok(tree)
    }
}

fn truncate_at_boundary(raw: &str, max_length: usize) -> (&str, bool) {
    if raw.len() <= max_length {
        return (raw, false);
    }
    let mut end = max_length;
    while end > 0 && !raw.is_char_boundary(end) {
        end -= 1;
    }
    (&raw[..end], true)
}

#[derive(Default)]
struct Scanner {
    tree: SyntaxTree,
    too_deep: bool,
}

impl Scanner {
    /// 产品序列：`Name/Version (comment) Name Name/Version ...`
    fn sequence(&mut self, s: &str, parent: NodeId, depth: usize) {
        let bytes = s.as_bytes();
        // 待定的产品名单词（多个裸单词 + `/` 组成多词产品名，如 "Mobile Safari"）
        let mut words: Vec<&str> = Vec::new();
        let mut word_start: Option<usize> = None;
        let mut last_product: Option<NodeId> = None;
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'(' => {
                    flush_word(s, pos, &mut word_start, &mut words);
                    let owner = if words.is_empty() {
                        last_product.unwrap_or(parent)
                    } else {
                        let product = self.product(parent, &words);
                        words.clear();
                        last_product = Some(product);
                        product
                    };
                    let (body, next) = comment_extent(s, pos + 1);
                    self.comment(body, owner, depth + 1);
                    pos = next;
                    continue;
                }
                b'/' if word_start.is_some() || !words.is_empty() => {
                    flush_word(s, pos, &mut word_start, &mut words);
                    let product = self.product(parent, &words);
                    words.clear();
                    let (version, next) = version_token(s, pos + 1);
                    if !version.is_empty() {
                        self.tree
                            .push(product, NodeKind::ProductVersion, Some(version.to_string()));
                    }
                    last_product = Some(product);
                    pos = next;
                    continue;
                }
                // Name/1.0/2.0：同一产品的追加版本
                b'/' if last_product.is_some() => {
                    let (version, next) = version_token(s, pos + 1);
                    if let (Some(product), false) = (last_product, version.is_empty()) {
                        self.tree
                            .push(product, NodeKind::ProductVersion, Some(version.to_string()));
                    }
                    pos = next;
                    continue;
                }
                // 多余的右括号：没有打开的单词时当作分隔符丢弃
                b')' if word_start.is_none() => {}
                b if b.is_ascii_whitespace() || b == b';' || b == b',' => {
                    flush_word(s, pos, &mut word_start, &mut words);
                }
                _ => {
                    if word_start.is_none() {
                        word_start = Some(pos);
                    }
                }
            }
            pos += 1;
        }

        flush_word(s, bytes.len(), &mut word_start, &mut words);
        if !words.is_empty() {
            self.product(parent, &words);
        }
    }

    fn product(&mut self, parent: NodeId, words: &[&str]) -> NodeId {
        self.tree
            .push(parent, NodeKind::Product, Some(words.join(" ")))
    }

    /// 注释块：按顶层 `;` `,` 拆分为条目
    fn comment(&mut self, body: &str, owner: NodeId, depth: usize) {
        let comment = self.tree.push(owner, NodeKind::Comment, None);
        for raw_entry in split_entries(body) {
            self.entry(raw_entry, comment, depth);
        }
    }

    fn entry(&mut self, raw: &str, comment: NodeId, depth: usize) {
        let bytes = raw.as_bytes();
        let mut text = String::with_capacity(raw.len());
        let mut nested: Vec<&str> = Vec::new();
        let mut segment_start = 0;
        let mut pos = 0;

        while pos < bytes.len() {
            if bytes[pos] == b'(' {
                text.push_str(&raw[segment_start..pos]);
                text.push(' ');
                let (body, next) = comment_extent(raw, pos + 1);
                nested.push(body);
                pos = next;
                segment_start = next;
                continue;
            }
            pos += 1;
        }
        text.push_str(&raw[segment_start..]);

        if depth >= MAX_COMMENT_DEPTH && !nested.is_empty() {
            self.too_deep = true;
            for body in nested.drain(..) {
                text.push(' ');
                text.push_str(&flatten_parens(body));
            }
        }

        let text = collapse_whitespace(&text);
        if text.is_empty() && nested.is_empty() {
            return;
        }

        let entry = self
            .tree
            .push(comment, NodeKind::CommentEntry, Some(text.clone()));
        self.entry_structure(&text, entry, depth);

        for body in nested {
            self.comment(body, entry, depth + 1);
        }
    }

    /// 条目内部结构：key=value / key:value，或内嵌的 Name/Version 产品
    fn entry_structure(&mut self, text: &str, entry: NodeId, depth: usize) {
        if is_url_like(text) {
            return;
        }
        if let Some((key, value)) = split_key_value(text) {
            let kv = self
                .tree
                .push(entry, NodeKind::KeyValue, Some(key.to_string()));
            self.tree.push(kv, NodeKind::Text, Some(value.to_string()));
            return;
        }
        if text.contains('/') {
            self.sequence(text, entry, depth);
        }
    }
}

fn flush_word<'a>(s: &'a str, pos: usize, word_start: &mut Option<usize>, words: &mut Vec<&'a str>) {
    if let Some(start) = word_start.take() {
        words.push(&s[start..pos]);
    }
}

/// 版本号：读取到空白或结构分隔符为止
fn version_token(s: &str, start: usize) -> (&str, usize) {
    let bytes = s.as_bytes();
    let mut end = start;
    while end < bytes.len() {
        match bytes[end] {
            b'(' | b')' | b';' | b',' | b'/' => break,
            b if b.is_ascii_whitespace() => break,
            _ => end += 1,
        }
    }
    (&s[start..end], end)
}

/// 定位注释体：start 为左括号之后的位置
/// 返回 (注释体, 右括号之后的位置)；未闭合的注释在输入末尾闭合
fn comment_extent(s: &str, start: usize) -> (&str, usize) {
    let bytes = s.as_bytes();
    let mut depth = 1usize;
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return (&s[start..pos], pos + 1);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    (&s[start..], bytes.len())
}

/// 按括号深度为0处的 `;` `,` 拆分注释体
fn split_entries(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (pos, b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b';' | b',' if depth == 0 => {
                entries.push(&body[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    entries.push(&body[start..]);
    entries
        .into_iter()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect()
}

fn split_key_value(text: &str) -> Option<(&str, &str)> {
    let split_at = text
        .find('=')
        .or_else(|| text.find(':').filter(|idx| !text[*idx..].starts_with("://")))?;
    let key = text[..split_at].trim();
    let value = text[split_at + 1..].trim();
    if key.is_empty() || value.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

fn is_url_like(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("www.") || lower.starts_with("+www.")
}

fn flatten_parens(s: &str) -> String {
    s.replace(['(', ')'], " ")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
