//! Configuration structures for the compression pipeline.

use serde::{Deserialize, Serialize};

/// Options resolved once per run and shared by every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// JPEG quality for re-encoded images (1-100).
    pub jpeg_quality: u8,

    /// Maximum pixel dimension (longer side) for embedded images.
    pub max_dimension: u32,

    /// Attempt the ghostscript whole-document pass.
    pub use_ghostscript: bool,

    /// Ghostscript quality preset.
    pub gs_preset: GsPreset,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            max_dimension: 1024,
            use_ghostscript: true,
            gs_preset: GsPreset::Ebook,
        }
    }
}

/// Ghostscript `-dPDFSETTINGS` presets, lowest to highest fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GsPreset {
    /// Lowest quality (72 dpi).
    Screen,
    /// Medium quality (150 dpi).
    Ebook,
    /// Good quality (300 dpi).
    Printer,
    /// High quality (300 dpi), colors preserved.
    Prepress,
}

impl GsPreset {
    /// Name as it appears in the ghostscript flag.
    pub fn as_flag(&self) -> &'static str {
        match self {
            GsPreset::Screen => "screen",
            GsPreset::Ebook => "ebook",
            GsPreset::Printer => "printer",
            GsPreset::Prepress => "prepress",
        }
    }
}

impl CompressionOptions {
    /// Load options from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save options to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_reference_settings() {
        let options = CompressionOptions::default();
        assert_eq!(options.jpeg_quality, 85);
        assert_eq!(options.max_dimension, 1024);
        assert!(options.use_ghostscript);
        assert_eq!(options.gs_preset, GsPreset::Ebook);
    }

    #[test]
    fn options_roundtrip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");

        let options = CompressionOptions {
            jpeg_quality: 70,
            max_dimension: 640,
            use_ghostscript: false,
            gs_preset: GsPreset::Screen,
        };
        options.save(&path).unwrap();

        let loaded = CompressionOptions::from_file(&path).unwrap();
        assert_eq!(loaded.jpeg_quality, 70);
        assert_eq!(loaded.max_dimension, 640);
        assert!(!loaded.use_ghostscript);
        assert_eq!(loaded.gs_preset, GsPreset::Screen);
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{ "jpeg_quality": 60 }"#).unwrap();

        let loaded = CompressionOptions::from_file(&path).unwrap();
        assert_eq!(loaded.jpeg_quality, 60);
        assert_eq!(loaded.max_dimension, 1024);
    }
}
