//! 缓存模块
pub mod result_cache;

pub use self::result_cache::ResultCache;
