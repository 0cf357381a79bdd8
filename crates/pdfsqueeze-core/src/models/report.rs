//! Per-file batch results and the persisted error log.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// File name of the error log written next to the compressed output.
pub const ERROR_LOG_NAME: &str = "compression_errors.json";

/// Outcome of compressing a single input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// A strategy produced a smaller file and it was committed.
    Compressed { original_size: u64, final_size: u64 },

    /// No candidate beat the original; the output is a byte copy.
    Unchanged { size: u64 },

    /// The file could not be processed at all.
    Failed { error: String },
}

/// Result for one input file. Every input produces exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// File name as discovered in the input directory.
    pub file_name: String,

    /// What happened to it.
    pub outcome: BatchOutcome,
}

/// Structured record of the files that failed during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLog {
    /// ISO-8601 timestamp of when the log was written.
    pub timestamp: String,

    /// Names of the files that failed.
    pub error_files: Vec<String>,
}

impl ErrorLog {
    /// Create a log stamped with the current time.
    pub fn new(error_files: Vec<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            error_files,
        }
    }

    /// Write the log as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

/// Names of the inputs that failed, in result order.
pub fn failed_files(results: &[FileResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| matches!(r.outcome, BatchOutcome::Failed { .. }))
        .map(|r| r.file_name.clone())
        .collect()
}
