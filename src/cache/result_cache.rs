//! 解析结果缓存（moka）
//!
//! 以原始 User-Agent 字符串为键（不做任何规范化），LRU淘汰。
//! 同一键的并发未命中只执行一次计算，其余调用者等待并共享结果。
//! 返回 `Arc<ParseResult>`，条目被淘汰不影响调用方手中的结果。
use std::sync::Arc;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use uasniff_engine::ParseResult;

/// 解析结果缓存
pub struct ResultCache {
    /// 容量为0时不建缓存，每次都直接计算
    cache: Option<Cache<String, Arc<ParseResult>>>,
    capacity: usize,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let cache = (capacity > 0).then(|| {
            Cache::builder()
                .max_capacity(capacity as u64)
                .eviction_policy(EvictionPolicy::lru())
                .build()
        });
        Self { cache, capacity }
    }

    /// 命中直接返回，未命中执行 compute 并写入
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> Arc<ParseResult>
    where
        F: FnOnce() -> ParseResult,
    {
        match &self.cache {
            Some(cache) => cache.get_with_by_ref(key, || Arc::new(compute())),
            None => Arc::new(compute()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<ParseResult>> {
        self.cache.as_ref().and_then(|cache| cache.get(key))
    }

    /// 当前条目数（近似值，淘汰为异步维护）
    pub fn len(&self) -> u64 {
        self.cache.as_ref().map_or(0, |cache| cache.entry_count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    /// 立即执行挂起的维护任务（淘汰/计数）
    pub fn sync(&self) {
        if let Some(cache) = &self.cache {
            cache.run_pending_tasks();
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
