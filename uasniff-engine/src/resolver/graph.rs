use std::collections::{BTreeMap, BTreeSet};

/// 字段依赖图（有向无环）
/// 边 A → B 表示计算 A 之前必须先得到 B：
/// - 派生字段 → 其派生依赖
/// - 基础字段 → 其规则引用的其他基础字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDependencyGraph {
    deps: BTreeMap<String, BTreeSet<String>>,
    order: Vec<String>,
    position: BTreeMap<String, usize>,
}

impl FieldDependencyGraph {
    /// 构建依赖图并计算拓扑序（Kahn算法，就绪集合有序，结果确定）
    /// 存在环时返回环上的字段（已排序）
    pub fn build(mut deps: BTreeMap<String, BTreeSet<String>>) -> Result<Self, Vec<String>> {
        // 仅作为依赖出现的字段补全为节点
        let referenced: Vec<String> = deps.values().flatten().cloned().collect();
        for name in referenced {
            deps.entry(name).or_default();
        }

        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        for (name, on) in &deps {
            pending.insert(name.as_str(), on.len());
            for dep in on {
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order: Vec<String> = Vec::with_capacity(deps.len());

        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            if let Some(children) = dependents.get(name) {
                for &child in children {
                    if let Some(count) = pending.get_mut(child) {
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(child);
                        }
                    }
                }
            }
        }

        if order.len() < deps.len() {
            return Err(Self::cycle_members(&deps, &order));
        }

        let position = order
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Ok(Self {
            deps,
            order,
            position,
        })
    }

    /// 剩余节点中反复剔除无人依赖的节点，余下的即为环上字段
    fn cycle_members(deps: &BTreeMap<String, BTreeSet<String>>, ordered: &[String]) -> Vec<String> {
        let done: BTreeSet<&str> = ordered.iter().map(String::as_str).collect();
        let mut remaining: BTreeSet<&str> = deps
            .keys()
            .map(String::as_str)
            .filter(|name| !done.contains(name))
            .collect();

        loop {
            let unneeded: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|name| {
                    !remaining
                        .iter()
                        .any(|other| deps.get(*other).map_or(false, |on| on.contains(*name)))
                })
                .collect();
            if unneeded.is_empty() {
                break;
            }
            for name in unneeded {
                remaining.remove(name);
            }
        }

        remaining.into_iter().map(str::to_string).collect()
    }

    /// 全部字段的拓扑序（依赖在前）
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// 字段在拓扑序中的位置
    pub fn position(&self, field: &str) -> Option<usize> {
        self.position.get(field).copied()
    }

    /// 字段的直接依赖
    pub fn dependencies(&self, field: &str) -> impl Iterator<Item = &str> {
        self.deps
            .get(field)
            .into_iter()
            .flat_map(|on| on.iter().map(String::as_str))
    }

    /// 计算请求字段所需的全部字段（含自身，传递闭包）
    pub fn closure<'a, I>(&self, requested: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut needed = BTreeSet::new();
        let mut stack: Vec<&str> = requested.into_iter().collect();
        while let Some(name) = stack.pop() {
            if !needed.insert(name.to_string()) {
                continue;
            }
            stack.extend(self.dependencies(name));
        }
        needed
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
