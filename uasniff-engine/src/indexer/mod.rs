mod path;
mod tree_index;

// 对外只导出具体内容，不导出模块名
pub use path::{PathPattern, PathStep};
pub use tree_index::{TreeIndex, GRAM_SIZE};
