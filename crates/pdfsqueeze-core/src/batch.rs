//! Batch processing with per-file failure isolation.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::models::config::CompressionOptions;
use crate::models::report::{failed_files, BatchOutcome, ErrorLog, FileResult, ERROR_LOG_NAME};
use crate::pipeline::CompressionOrchestrator;

/// Applies the orchestrator across a set of input files.
///
/// One file's failure never aborts the batch; every input yields exactly one
/// [`FileResult`], in input order.
pub struct BatchRunner {
    orchestrator: CompressionOrchestrator,
}

impl BatchRunner {
    pub fn new(options: CompressionOptions) -> Self {
        Self {
            orchestrator: CompressionOrchestrator::new(options),
        }
    }

    /// Process every file, then persist the error log into `output_dir` if
    /// any file failed.
    pub fn run(&self, files: &[PathBuf], output_dir: &Path) -> Vec<FileResult> {
        let results: Vec<FileResult> = files
            .iter()
            .map(|file| self.process_file(file, output_dir))
            .collect();

        let failed = failed_files(&results);
        if !failed.is_empty() {
            let log_path = output_dir.join(ERROR_LOG_NAME);
            if let Err(e) = ErrorLog::new(failed).save(&log_path) {
                warn!("failed to write error log {}: {}", log_path.display(), e);
            }
        }

        results
    }

    /// Process a single file into `<output_dir>/<stem>_compressed.pdf`.
    pub fn process_file(&self, input: &Path, output_dir: &Path) -> FileResult {
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let output = output_dir.join(format!("{}_compressed.pdf", stem));

        match self.orchestrator.compress_document(input, &output) {
            Ok(outcome) if outcome.improved => FileResult {
                file_name,
                outcome: BatchOutcome::Compressed {
                    original_size: outcome.original_size,
                    final_size: outcome.final_size,
                },
            },
            Ok(outcome) => FileResult {
                file_name,
                outcome: BatchOutcome::Unchanged {
                    size: outcome.original_size,
                },
            },
            Err(e) => {
                warn!("failed to process {}: {}", input.display(), e);
                FileResult {
                    file_name,
                    outcome: BatchOutcome::Failed {
                        error: e.to_string(),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{document_with_image, image_stream, jpeg_bytes};
    use pretty_assertions::assert_eq;

    fn options() -> CompressionOptions {
        CompressionOptions {
            max_dimension: 640,
            use_ghostscript: false,
            ..CompressionOptions::default()
        }
    }

    #[test]
    fn every_input_yields_exactly_one_result() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        std::fs::create_dir_all(&output_dir).unwrap();

        let good = dir.path().join("good.pdf");
        let mut doc =
            document_with_image(image_stream(jpeg_bytes(1600, 1200), 1600, 1200, "DCTDecode"));
        doc.save(&good).unwrap();

        let corrupt = dir.path().join("corrupt.pdf");
        std::fs::write(&corrupt, b"this is not a pdf").unwrap();

        let runner = BatchRunner::new(options());
        let results = runner.run(&[good, corrupt], &output_dir);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].file_name, "good.pdf");
        assert!(!matches!(results[0].outcome, BatchOutcome::Failed { .. }));
        assert_eq!(results[1].file_name, "corrupt.pdf");
        assert!(matches!(results[1].outcome, BatchOutcome::Failed { .. }));

        // A good file always gets an output, improved or not.
        assert!(output_dir.join("good_compressed.pdf").exists());
    }

    #[test]
    fn error_log_lists_the_failed_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        std::fs::create_dir_all(&output_dir).unwrap();

        let corrupt = dir.path().join("broken.pdf");
        std::fs::write(&corrupt, b"junk").unwrap();

        let runner = BatchRunner::new(options());
        let results = runner.run(&[corrupt], &output_dir);
        assert_eq!(failed_files(&results), vec!["broken.pdf".to_string()]);

        let log_path = output_dir.join(ERROR_LOG_NAME);
        let log: ErrorLog =
            serde_json::from_str(&std::fs::read_to_string(&log_path).unwrap()).unwrap();
        assert_eq!(log.error_files, vec!["broken.pdf".to_string()]);
    }

    #[test]
    fn no_error_log_when_everything_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        std::fs::create_dir_all(&output_dir).unwrap();

        let good = dir.path().join("good.pdf");
        let mut doc =
            document_with_image(image_stream(jpeg_bytes(800, 600), 800, 600, "DCTDecode"));
        doc.save(&good).unwrap();

        let runner = BatchRunner::new(options());
        runner.run(&[good], &output_dir);

        assert!(!output_dir.join(ERROR_LOG_NAME).exists());
    }
}
