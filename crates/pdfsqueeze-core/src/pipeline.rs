//! Strategy orchestration: run every enabled compression strategy against
//! the same input and commit the smallest result.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::ghostscript::GhostscriptCompressor;
use crate::models::config::CompressionOptions;
use crate::pdf::ImageRewriter;

/// Tag identifying which strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// External ghostscript whole-document pass.
    Ghostscript,
    /// In-process image rewrite.
    ImageRewrite,
}

/// One strategy's output, pending comparison.
#[derive(Debug, Clone)]
struct Candidate {
    strategy: Strategy,
    path: PathBuf,
    size: u64,
}

/// Result of orchestrating one document.
#[derive(Debug, Clone, Copy)]
pub struct CompressionOutcome {
    /// Whether any strategy beat the original.
    pub improved: bool,
    /// Size of the input file in bytes.
    pub original_size: u64,
    /// Size of the committed output in bytes.
    pub final_size: u64,
    /// Winning strategy, if any.
    pub strategy: Option<Strategy>,
}

/// Runs the enabled strategies independently and commits the best result.
pub struct CompressionOrchestrator {
    options: CompressionOptions,
    ghostscript: GhostscriptCompressor,
}

impl CompressionOrchestrator {
    pub fn new(options: CompressionOptions) -> Self {
        let ghostscript = GhostscriptCompressor::new(options.gs_preset);
        Self {
            options,
            ghostscript,
        }
    }

    /// Substitute the ghostscript wrapper, e.g. to point at a differently
    /// named binary.
    pub fn with_ghostscript(mut self, ghostscript: GhostscriptCompressor) -> Self {
        self.ghostscript = ghostscript;
        self
    }

    /// Compress `input` into `output`, never producing a larger file.
    ///
    /// Both strategies read the original input; they are compared, not
    /// chained. If neither wins, the output is a byte copy of the input.
    /// Scratch files live in a temporary directory that is removed on every
    /// exit path.
    pub fn compress_document(&self, input: &Path, output: &Path) -> Result<CompressionOutcome> {
        let original_size = fs::metadata(input)?.len();
        let scratch = tempfile::tempdir()?;
        let mut candidates = Vec::new();

        if self.options.use_ghostscript {
            let gs_output = scratch.path().join("ghostscript.pdf");
            if self.ghostscript.compress(input, &gs_output) && gs_output.exists() {
                let size = fs::metadata(&gs_output)?.len();
                debug!(
                    "ghostscript candidate: {:.2}KB -> {:.2}KB",
                    original_size as f64 / 1024.0,
                    size as f64 / 1024.0
                );
                candidates.push(Candidate {
                    strategy: Strategy::Ghostscript,
                    path: gs_output,
                    size,
                });
            }
        }

        let rewrite_output = scratch.path().join("rewritten.pdf");
        let rewriter = ImageRewriter::new(self.options.clone());
        let stats = rewriter.rewrite(input, &rewrite_output)?;
        let size = fs::metadata(&rewrite_output)?.len();
        debug!(
            "rewrite candidate: {:.2}KB -> {:.2}KB ({} of {} images replaced)",
            original_size as f64 / 1024.0,
            size as f64 / 1024.0,
            stats.images_replaced,
            stats.images_seen
        );
        candidates.push(Candidate {
            strategy: Strategy::ImageRewrite,
            path: rewrite_output,
            size,
        });

        match select_best(original_size, &candidates) {
            Some(best) => {
                fs::copy(&best.path, output)?;
                Ok(CompressionOutcome {
                    improved: true,
                    original_size,
                    final_size: best.size,
                    strategy: Some(best.strategy),
                })
            }
            None => {
                fs::copy(input, output)?;
                Ok(CompressionOutcome {
                    improved: false,
                    original_size,
                    final_size: original_size,
                    strategy: None,
                })
            }
        }
    }
}

/// Pick the smallest candidate strictly below the original size.
///
/// Candidates are considered in order and only a strictly smaller size
/// displaces the current best, so equal-size candidates lose to earlier
/// ones.
fn select_best(original_size: u64, candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    let mut best_size = original_size;

    for candidate in candidates {
        if candidate.size < best_size {
            best_size = candidate.size;
            best = Some(candidate);
        }
    }

    best
}
