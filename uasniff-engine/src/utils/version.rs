//! 版本号工具：比较、截断、规范化
use std::cmp::Ordering;

#[inline(always)]
fn is_version_separator(c: char) -> bool {
    c == '.' || c == '_'
}

/// 版本号比较（按段比较，纯数字段按数值比较，其余按字典序）
/// 缺失的段视为0：1.0 == 1.0.0
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let mut l = left.trim().split(is_version_separator);
    let mut r = right.trim().split(is_version_separator);
    loop {
        match (l.next(), r.next()) {
            (None, None) => return Ordering::Equal,
            (Some(a), None) => {
                if !is_zero_segment(a) {
                    return Ordering::Greater;
                }
            }
            (None, Some(b)) => {
                if !is_zero_segment(b) {
                    return Ordering::Less;
                }
            }
            (Some(a), Some(b)) => {
                let ord = compare_segment(a, b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn is_zero_segment(segment: &str) -> bool {
    segment.is_empty() || segment.bytes().all(|b| b == b'0')
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        // 前导数字相同则比较后缀（如 7a 与 7b）
        _ => {
            let (na, ra) = split_numeric_prefix(a);
            let (nb, rb) = split_numeric_prefix(b);
            match (na, nb) {
                (Some(x), Some(y)) if x != y => x.cmp(&y),
                _ => ra.to_ascii_lowercase().cmp(&rb.to_ascii_lowercase()),
            }
        }
    }
}

fn split_numeric_prefix(segment: &str) -> (Option<u64>, &str) {
    let end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    (segment[..end].parse::<u64>().ok(), &segment[end..])
}

/// 保留前 parts 段版本号，parts=0 返回None
pub fn truncate_version(version: &str, parts: usize) -> Option<String> {
    let version = version.trim();
    if version.is_empty() || parts == 0 {
        return None;
    }
    let kept: Vec<&str> = version
        .split(is_version_separator)
        .take(parts)
        .collect();
    let joined = kept.join(".");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// 主版本号
#[inline(always)]
pub fn major_version(version: &str) -> Option<String> {
    truncate_version(version, 1)
}

/// 下划线版本号规范化：10_3_1 → 10.3.1
pub fn clean_version(version: &str) -> String {
    version.trim().replace('_', ".")
}
