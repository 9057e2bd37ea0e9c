//! 模板提取工具
//! 负责从正则捕获结果中，根据模板拼出字段值
//! 支持 \1/\2 或 $1/$2 两种分组引用格式，自动过滤无效结果

use regex::Captures;

/// 从正则捕获结果中按模板提取值
///
/// # 返回值
/// - `Some(String)`: 提取到的有效值
/// - `None`: 模板为空 / 没有任何分组参与替换 / 结果为空 / 残留占位符
pub fn expand_template(template: &str, captures: &Captures) -> Option<String> {
    if template.trim().is_empty() {
        return None;
    }

    let mut value = template.to_string();
    // 标记是否发生过有效的分组替换（避免无替换却返回模板本身）
    let mut replaced = false;

    // 倒序替换，避免 $1 误伤 $10
    for group_index in (1..captures.len()).rev() {
        let placeholder_backslash = format!("\\{}", group_index);
        let placeholder_dollar = format!("${}", group_index);
        if !value.contains(&placeholder_backslash) && !value.contains(&placeholder_dollar) {
            continue;
        }

        match captures.get(group_index) {
            Some(matched) => {
                let matched_str = matched.as_str().trim();
                value = value.replace(&placeholder_backslash, matched_str);
                value = value.replace(&placeholder_dollar, matched_str);
                if !matched_str.is_empty() {
                    replaced = true;
                }
            }
            None => {
                value = value.replace(&placeholder_backslash, "");
                value = value.replace(&placeholder_dollar, "");
            }
        }
    }

    // 纯字面量模板（无占位符）视为有效
    let literal_template = !template.contains('$') && !template.contains('\\');
    let final_value = value.trim().to_string();

    let is_valid = (replaced || literal_template)
        && !final_value.is_empty()
        && !final_value.contains('\\')
        && !final_value.contains('$');

    if is_valid {
        Some(final_value)
    } else {
        None
    }
}
