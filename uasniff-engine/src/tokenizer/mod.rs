mod scanner;

pub use scanner::{tokenize, SyntaxError, SyntaxErrorKind, DEFAULT_MAX_LENGTH, MAX_COMMENT_DEPTH};
