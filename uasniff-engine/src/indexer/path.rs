use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::core::NodeKind;

/// 路径中的单步：节点类型 + 可选的同类兄弟序号（0起）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathStep {
    pub kind: NodeKind,
    pub index: Option<usize>,
}

/// 节点路径模式，形如 `product[0]/comment[0]/entry[1]`
/// 从根节点下第一层开始逐级匹配，长度必须与节点深度一致
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    steps: Vec<PathStep>,
}

impl PathPattern {
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// 目标节点类型（最后一步）
    pub fn target_kind(&self) -> NodeKind {
        // 解析保证至少一步
        self.steps
            .last()
            .map(|step| step.kind)
            .unwrap_or(NodeKind::Root)
    }
}

impl FromStr for PathPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err("empty path".to_string());
        }

        let mut steps = Vec::new();
        for raw in trimmed.split('/') {
            let raw = raw.trim();
            let (kind_part, index) = match raw.find('[') {
                Some(open) => {
                    let close = raw
                        .strip_suffix(']')
                        .ok_or_else(|| format!("unterminated index in path step '{}'", raw))?;
                    let index_str = &close[open + 1..];
                    let index = index_str
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| format!("invalid index '{}' in path step '{}'", index_str, raw))?;
                    (&raw[..open], Some(index))
                }
                None => (raw, None),
            };
            let kind = kind_part.parse::<NodeKind>()?;
            if kind == NodeKind::Root {
                return Err(format!("path step '{}' cannot target the root", raw));
            }
            steps.push(PathStep { kind, index });
        }

        Ok(Self { steps })
    }
}

impl Display for PathPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step.kind)?;
            if let Some(index) = step.index {
                write!(f, "[{}]", index)?;
            }
        }
        Ok(())
    }
}
