use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming an optional JSON settings file.
pub const CONFIG_ENV: &str = "SERIES_VIEWER_CONFIG";

// ---------------------------------------------------------------------------
// Parse settings
// ---------------------------------------------------------------------------

/// Knobs for loading and classifying tables.
///
/// Every field has a default, so a settings file only needs the keys it
/// overrides:
///
/// ```json
/// { "strict_formats": ["%d.%m.%Y %H:%M"], "trailing_markers": ["Uhr"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Candidate delimiters tried while sniffing delimited text.
    pub delimiters: Vec<char>,
    /// Number of leading non-empty lines inspected while sniffing.
    pub sniff_lines: usize,
    /// Fixed chrono patterns for known exports, tried before auto-detection.
    pub strict_formats: Vec<String>,
    /// Words stripped from the end of a cell before strict parsing.
    pub trailing_markers: Vec<String>,
    /// Rows shown in the data preview.
    pub preview_rows: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            delimiters: vec![',', ';', '\t', '|'],
            sniff_lines: 20,
            strict_formats: vec!["%d.%m.%Y %H:%M:%S".into(), "%d.%m.%Y %H:%M".into()],
            trailing_markers: vec!["Uhr".into(), "h".into()],
            preview_rows: 5,
        }
    }
}

impl ParseConfig {
    /// Read settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        serde_json::from_str(&text).context("parsing settings JSON")
    }

    /// Settings from the file named by [`CONFIG_ENV`], or defaults.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(cfg) => {
                log::info!("Loaded settings from {}", Path::new(&path).display());
                cfg
            }
            Err(e) => {
                log::warn!("Ignoring settings file: {e:#}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "trailing_markers": ["Uhr", "o'clock"], "preview_rows": 10 }}"#)
            .unwrap();

        let cfg = ParseConfig::load(file.path()).unwrap();
        assert_eq!(cfg.trailing_markers, vec!["Uhr", "o'clock"]);
        assert_eq!(cfg.preview_rows, 10);
        assert_eq!(cfg.delimiters, ParseConfig::default().delimiters);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(ParseConfig::load(file.path()).is_err());
    }
}
