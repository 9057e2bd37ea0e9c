use std::fmt::{Display, Formatter};

use super::enums::NodeKind;

/// 节点ID：语法树节点数组（arena）中的下标，根节点固定为0
pub type NodeId = usize;

/// 节点路径：从根节点出发的子节点下标序列
/// 仅由树形结构决定，同一输入重复解析得到完全相同的路径
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<u32>);

impl NodePath {
    /// 根节点路径（空序列）
    pub fn root() -> Self {
        Self::default()
    }

    /// 生成子节点路径
    /// 同级节点数受输入长度限制，远小于 u32 上限
    pub fn child(&self, index: usize) -> Self {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(u32::try_from(index).unwrap_or(u32::MAX));
        Self(steps)
    }

    pub fn steps(&self) -> &[u32] {
        &self.0
    }

    /// 路径深度（根节点为0）
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("/")?;
        for (idx, step) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// 语法树节点
/// - children 仅保存子节点ID，子节点由树的 arena 独占持有
/// - 父子关系通过 path 隐式表达，不存在反向指针
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub text: Option<String>,
    pub children: Vec<NodeId>,
    pub path: NodePath,
}

/// 语法树（arena存储），解析后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTree {
    /// 根节点ID
    pub const ROOT: NodeId = 0;

    /// 创建仅包含根节点的空树
    pub fn new() -> Self {
        Self {
            nodes: vec![SyntaxNode {
                kind: NodeKind::Root,
                text: None,
                children: Vec::new(),
                path: NodePath::root(),
            }],
        }
    }

    /// 追加子节点，返回新节点ID（仅供分词器构建期调用）
    pub(crate) fn push(&mut self, parent: NodeId, kind: NodeKind, text: Option<String>) -> NodeId {
        let id = self.nodes.len();
        let index = self.nodes[parent].children.len();
        let path = self.nodes[parent].path.child(index);
        self.nodes.push(SyntaxNode {
            kind,
            text,
            children: Vec::new(),
            path,
        });
        self.nodes[parent].children.push(id);
        id
    }

    #[inline(always)]
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    #[inline(always)]
    pub fn root(&self) -> &SyntaxNode {
        &self.nodes[Self::ROOT]
    }

    /// 节点文本（无文本返回None）
    #[inline(always)]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].text.as_deref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// arena 顺序的全部节点
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.nodes.iter().enumerate()
    }

    /// 先序遍历（文档顺序）的节点ID序列
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.nodes[current].children.iter().rev().copied());
        }
        order
    }

    /// 指定节点的直接子节点中，第一个指定类型的节点
    pub fn first_child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[*child].kind == kind)
    }

    /// 按文档顺序查找子树中第一个指定类型的后代节点（不含自身）
    pub fn first_descendant_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.nodes[current].kind == kind {
                return Some(current);
            }
            stack.extend(self.nodes[current].children.iter().rev().copied());
        }
        None
    }

    /// 通过路径逐级还原祖先链（不含根节点，含自身）
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::with_capacity(self.nodes[id].path.depth());
        let mut current = Self::ROOT;
        for step in self.nodes[id].path.steps() {
            current = self.nodes[current].children[*step as usize];
            chain.push(current);
        }
        chain
    }

    /// 树结构的紧凑文本形式（调试/日志用）
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_node(Self::ROOT, &mut out);
        out
    }

    fn describe_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id];
        out.push_str(&node.kind.to_string());
        if let Some(text) = &node.text {
            out.push_str("=\"");
            out.push_str(text);
            out.push('"');
        }
        if !node.children.is_empty() {
            out.push('[');
            for (idx, child) in node.children.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                self.describe_node(*child, out);
            }
            out.push(']');
        }
    }
}
