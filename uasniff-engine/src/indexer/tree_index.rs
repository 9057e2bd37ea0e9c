//! 语法树索引
//! 解析得到语法树后构建一次，供全部匹配规则共享查询：
//! - 按节点类型分组（文档顺序）
//! - 小写文本精确索引
//! - 4字节 n-gram 倒排索引（懒构建，子串查询时才付出成本）
//! - 同类兄弟序号（路径匹配用）

use once_cell::unsync::OnceCell;
use rustc_hash::{FxHashMap, FxHashSet};

use super::path::PathPattern;
use crate::core::{NodeId, NodeKind, SyntaxTree};
use crate::utils::safe_lowercase;

/// n-gram 长度（字节）
pub const GRAM_SIZE: usize = 4;

type Gram = [u8; GRAM_SIZE];

pub struct TreeIndex<'t> {
    tree: &'t SyntaxTree,
    /// 按类型分组的节点ID（先序）
    by_kind: [Vec<NodeId>; NodeKind::COUNT],
    /// 节点小写文本（无文本为空串），按 NodeId 下标
    lower: Vec<String>,
    /// 节点在父节点同类子节点中的序号（0起）
    ordinal: Vec<usize>,
    /// 小写文本 → 节点ID（先序）
    exact: FxHashMap<String, Vec<NodeId>>,
    grams: OnceCell<FxHashMap<Gram, Vec<NodeId>>>,
    preorder: Vec<NodeId>,
}

impl<'t> TreeIndex<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        let preorder = tree.preorder();
        let mut by_kind: [Vec<NodeId>; NodeKind::COUNT] = Default::default();
        let mut lower = vec![String::new(); tree.len()];
        let mut ordinal = vec![0usize; tree.len()];
        let mut exact: FxHashMap<String, Vec<NodeId>> = FxHashMap::default();

        for &id in &preorder {
            let node = tree.node(id);
            by_kind[node.kind.slot()].push(id);

            if let Some(text) = &node.text {
                let lowered = safe_lowercase(text);
                exact.entry(lowered.clone()).or_default().push(id);
                lower[id] = lowered;
            }

            let mut counters = [0usize; NodeKind::COUNT];
            for &child in &node.children {
                let slot = tree.node(child).kind.slot();
                ordinal[child] = counters[slot];
                counters[slot] += 1;
            }
        }

        Self {
            tree,
            by_kind,
            lower,
            ordinal,
            exact,
            grams: OnceCell::new(),
            preorder,
        }
    }

    #[inline(always)]
    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// 指定类型的全部节点（文档顺序）
    #[inline(always)]
    pub fn nodes_of_kind(&self, kind: NodeKind) -> &[NodeId] {
        &self.by_kind[kind.slot()]
    }

    /// 节点小写文本
    #[inline(always)]
    pub fn lower_text(&self, id: NodeId) -> &str {
        &self.lower[id]
    }

    #[inline(always)]
    pub fn ordinal(&self, id: NodeId) -> usize {
        self.ordinal[id]
    }

    /// 文本精确等于 needle_lower（已小写）的指定类型节点
    pub fn nodes_with_text(&self, kind: NodeKind, needle_lower: &str) -> Vec<NodeId> {
        self.exact
            .get(needle_lower)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.tree.node(*id).kind == kind)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 文本包含 needle_lower（已小写）的指定类型节点，文档顺序
    /// 长度不足一个 gram 的短串退化为按类型扫描
    pub fn candidates_containing(&self, kind: NodeKind, needle_lower: &str) -> Vec<NodeId> {
        let needle = needle_lower.as_bytes();
        if needle.len() < GRAM_SIZE {
            return self
                .nodes_of_kind(kind)
                .iter()
                .copied()
                .filter(|id| self.lower[*id].contains(needle_lower))
                .collect();
        }

        let grams = self.grams();
        // 选出现次数最少的 gram 作为候选集，再逐个校验
        let mut rarest: Option<&Vec<NodeId>> = None;
        for window in needle.windows(GRAM_SIZE) {
            let mut key = [0u8; GRAM_SIZE];
            key.copy_from_slice(window);
            match grams.get(&key) {
                None => return Vec::new(),
                Some(postings) => {
                    if rarest.map_or(true, |r| postings.len() < r.len()) {
                        rarest = Some(postings);
                    }
                }
            }
        }

        rarest
            .map(|postings| {
                postings
                    .iter()
                    .copied()
                    .filter(|id| self.tree.node(*id).kind == kind)
                    .filter(|id| self.lower[*id].contains(needle_lower))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 路径命中的全部节点（文档顺序）
    pub fn match_path(&self, path: &PathPattern) -> Vec<NodeId> {
        let steps = path.steps();
        self.nodes_of_kind(path.target_kind())
            .iter()
            .copied()
            .filter(|id| {
                let chain = self.tree.ancestry(*id);
                chain.len() == steps.len()
                    && chain.iter().zip(steps).all(|(node, step)| {
                        self.tree.node(*node).kind == step.kind
                            && step.index.map_or(true, |idx| self.ordinal[*node] == idx)
                    })
            })
            .collect()
    }

    /// 指定类型第 n 个节点（0起，文档顺序）的原始文本
    pub fn nth_text(&self, kind: NodeKind, n: usize) -> Option<&'t str> {
        self.nodes_of_kind(kind)
            .get(n)
            .and_then(|id| self.tree.text(*id))
    }

    fn grams(&self) -> &FxHashMap<Gram, Vec<NodeId>> {
        self.grams.get_or_init(|| {
            let mut map: FxHashMap<Gram, Vec<NodeId>> = FxHashMap::default();
            let mut seen: FxHashSet<Gram> = FxHashSet::default();
            for &id in &self.preorder {
                seen.clear();
                for window in self.lower[id].as_bytes().windows(GRAM_SIZE) {
                    let mut key = [0u8; GRAM_SIZE];
                    key.copy_from_slice(window);
                    if seen.insert(key) {
                        map.entry(key).or_default().push(id);
                    }
                }
            }
            log::trace!(
                "Tree n-gram index built | Nodes: {} | Grams: {}",
                self.preorder.len(),
                map.len()
            );
            map
        })
    }
}
