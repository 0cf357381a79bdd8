//! Whole-document compression through an external ghostscript process.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::models::config::GsPreset;

/// Wrapper around the ghostscript `pdfwrite` device.
///
/// Ghostscript is treated as a black box: it either produces an output file
/// and exits zero, or the strategy is skipped. Callers must still check that
/// the output file exists before trusting a `true` result.
pub struct GhostscriptCompressor {
    program: String,
    preset: GsPreset,
}

impl GhostscriptCompressor {
    pub fn new(preset: GsPreset) -> Self {
        Self {
            program: default_program().to_string(),
            preset,
        }
    }

    /// Override the ghostscript executable name.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Run a single compression attempt. Success is strictly exit code zero;
    /// a missing binary or non-zero exit returns `false`. No retry.
    pub fn compress(&self, input: &Path, output: &Path) -> bool {
        let status = Command::new(&self.program)
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg(format!("-dPDFSETTINGS=/{}", self.preset.as_flag()))
            .arg("-dNOPAUSE")
            .arg("-dQUIET")
            .arg("-dBATCH")
            .arg(format!("-sOutputFile={}", output.display()))
            .arg(input)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                debug!("ghostscript exited with {}", status);
                false
            }
            Err(e) => {
                debug!("ghostscript unavailable: {}", e);
                false
            }
        }
    }
}

fn default_program() -> &'static str {
    if cfg!(windows) { "gswin64c" } else { "gs" }
}
