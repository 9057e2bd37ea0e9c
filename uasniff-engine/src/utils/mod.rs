pub mod template;
pub mod text;
pub mod version;

pub use template::expand_template;
pub use text::{preview_compact, safe_lowercase, LogPreview};
pub use version::{clean_version, compare_versions, major_version, truncate_version};
