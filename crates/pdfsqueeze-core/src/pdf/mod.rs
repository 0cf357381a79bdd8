//! PDF document rewriting module.

mod rewriter;

pub use rewriter::{ImageRewriter, RewriteStats};
