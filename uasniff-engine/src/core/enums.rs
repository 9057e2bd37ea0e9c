use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// 语法树节点类型枚举，覆盖 User-Agent 的全部结构
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Product,
    ProductVersion,
    Comment,
    CommentEntry,
    KeyValue,
    Text,
}

impl NodeKind {
    /// 节点类型数量
    pub const COUNT: usize = 7;

    /// 全部节点类型（用于按类型建立索引）
    pub const ALL: [NodeKind; Self::COUNT] = [
        NodeKind::Root,
        NodeKind::Product,
        NodeKind::ProductVersion,
        NodeKind::Comment,
        NodeKind::CommentEntry,
        NodeKind::KeyValue,
        NodeKind::Text,
    ];

    /// 类型在按类型索引数组中的下标
    #[inline(always)]
    pub fn slot(self) -> usize {
        match self {
            NodeKind::Root => 0,
            NodeKind::Product => 1,
            NodeKind::ProductVersion => 2,
            NodeKind::Comment => 3,
            NodeKind::CommentEntry => 4,
            NodeKind::KeyValue => 5,
            NodeKind::Text => 6,
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Root => write!(f, "root"),
            NodeKind::Product => write!(f, "product"),
            NodeKind::ProductVersion => write!(f, "version"),
            NodeKind::Comment => write!(f, "comment"),
            NodeKind::CommentEntry => write!(f, "entry"),
            NodeKind::KeyValue => write!(f, "keyvalue"),
            NodeKind::Text => write!(f, "text"),
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "root" => Ok(NodeKind::Root),
            "product" => Ok(NodeKind::Product),
            "version" | "product_version" => Ok(NodeKind::ProductVersion),
            "comment" => Ok(NodeKind::Comment),
            "entry" | "comment_entry" => Ok(NodeKind::CommentEntry),
            "keyvalue" | "key_value" => Ok(NodeKind::KeyValue),
            "text" => Ok(NodeKind::Text),
            other => Err(format!("unknown node kind '{}'", other)),
        }
    }
}
