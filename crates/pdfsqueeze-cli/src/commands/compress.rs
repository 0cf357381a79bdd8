//! Compress command - batch-compress every PDF in a directory.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use pdfsqueeze_core::models::config::{CompressionOptions, GsPreset};
use pdfsqueeze_core::models::report::{BatchOutcome, ErrorLog, FileResult, ERROR_LOG_NAME};
use pdfsqueeze_core::BatchRunner;

/// Arguments for the compress command.
#[derive(Args)]
pub struct CompressArgs {
    /// Input directory containing PDF files
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for compressed files (default: <input>/compressed_pdfs)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JPEG quality for image compression
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Maximum dimension for embedded images, in pixels
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    size: Option<u32>,

    /// Ghostscript quality preset
    #[arg(short, long, value_enum)]
    ghostscript: Option<PresetArg>,

    /// Skip the ghostscript whole-document pass
    #[arg(long)]
    no_ghostscript: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum PresetArg {
    /// Lowest quality (72 dpi)
    Screen,
    /// Medium quality (150 dpi)
    Ebook,
    /// Good quality (300 dpi)
    Printer,
    /// High quality (300 dpi) preserving colors
    Prepress,
}

impl From<PresetArg> for GsPreset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Screen => GsPreset::Screen,
            PresetArg::Ebook => GsPreset::Ebook,
            PresetArg::Printer => GsPreset::Printer,
            PresetArg::Prepress => GsPreset::Prepress,
        }
    }
}

pub fn run(args: CompressArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    // Load configuration, then let flags override individual fields
    let mut options = if let Some(path) = config_path {
        CompressionOptions::from_file(std::path::Path::new(path))?
    } else {
        CompressionOptions::default()
    };
    if let Some(quality) = args.quality {
        options.jpeg_quality = quality;
    }
    if let Some(size) = args.size {
        options.max_dimension = size;
    }
    if let Some(preset) = args.ghostscript {
        options.gs_preset = preset.into();
    }
    if args.no_ghostscript {
        options.use_ghostscript = false;
    }

    if !args.input.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", args.input.display());
    }

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.join("compressed_pdfs"));
    fs::create_dir_all(&output_dir)?;
    info!("Compressed PDFs will be saved to: {}", output_dir.display());

    // Non-recursive discovery, sorted for a stable report order
    let pattern = args.input.join("*.pdf");
    let mut files: Vec<PathBuf> = glob(&pattern.to_string_lossy())?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    println!(
        "{} Found {} PDF files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let runner = BatchRunner::new(options);
    let mut results = Vec::with_capacity(files.len());

    for (i, file) in files.iter().enumerate() {
        info!(
            "Processing ({}/{}): {}",
            i + 1,
            files.len(),
            file.file_name().unwrap_or_default().to_string_lossy()
        );

        let result = runner.process_file(file, &output_dir);
        match &result.outcome {
            BatchOutcome::Compressed {
                original_size,
                final_size,
            } => {
                let reduction = (1.0 - *final_size as f64 / *original_size as f64) * 100.0;
                info!(
                    "Compressed {}: {:.2} KB -> {:.2} KB ({:.2}% reduction)",
                    result.file_name,
                    *original_size as f64 / 1024.0,
                    *final_size as f64 / 1024.0,
                    reduction
                );
            }
            BatchOutcome::Unchanged { .. } => {
                info!("No significant compression achieved for {}", result.file_name);
            }
            BatchOutcome::Failed { error } => {
                warn!("Failed to process {}: {}", result.file_name, error);
            }
        }

        results.push(result);
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let compressed = results
        .iter()
        .filter(|r| matches!(r.outcome, BatchOutcome::Compressed { .. }))
        .count();
    let unchanged = results
        .iter()
        .filter(|r| matches!(r.outcome, BatchOutcome::Unchanged { .. }))
        .count();
    let failed: Vec<&FileResult> = results
        .iter()
        .filter(|r| matches!(r.outcome, BatchOutcome::Failed { .. }))
        .collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} compressed, {} unchanged, {} failed",
        style(compressed).green(),
        unchanged,
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        let log_path = output_dir.join(ERROR_LOG_NAME);
        let names = failed.iter().map(|r| r.file_name.clone()).collect();
        ErrorLog::new(names).save(&log_path)?;
        warn!(
            "{} files could not be compressed. See {} for details.",
            failed.len(),
            log_path.display()
        );

        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            if let BatchOutcome::Failed { error } = &result.outcome {
                println!("  - {}: {}", result.file_name, error);
            }
        }
    }

    info!("PDF compression completed");
    Ok(())
}
