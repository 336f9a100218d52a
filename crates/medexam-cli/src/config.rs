//! `medexam.toml` configuration
//!
//! ```toml
//! [import]
//! actor = "nurse.lan"
//! student_id_column = 1
//!
//! [export]
//! sheet_name = "Kết quả khám"
//! freeze_header = true
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use medexam_core::{ImportOptions, DEFAULT_SHEET_NAME};
use medexam_xlsx::ExcelExporter;
use serde::Deserialize;
use tracing::debug;

/// Looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "medexam.toml";

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub import: ImportConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// User recorded in result audit fields
    pub actor: String,
    pub student_id_column: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        let options = ImportOptions::default();
        Self {
            actor: options.actor,
            student_id_column: options.student_id_column,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub sheet_name: String,
    pub freeze_header: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.into(),
            freeze_header: true,
        }
    }
}

impl Config {
    /// Load an explicit config file, or `medexam.toml` if present, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions::new()
            .actor(self.import.actor.clone())
            .student_id_column(self.import.student_id_column)
    }

    pub fn exporter(&self) -> ExcelExporter {
        let exporter = ExcelExporter::new().sheet_name(self.export.sheet_name.clone());
        if self.export.freeze_header {
            exporter
        } else {
            exporter.no_freeze()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.import_options(), ImportOptions::default());
        assert_eq!(config.exporter().sheet_name, DEFAULT_SHEET_NAME);
        assert!(config.exporter().freeze_header);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [import]
            actor = "nurse.lan"

            [export]
            freeze_header = false
            "#,
        )
        .unwrap();

        let options = config.import_options();
        assert_eq!(options.actor, "nurse.lan");
        assert_eq!(options.student_id_column, 1);

        let exporter = config.exporter();
        assert_eq!(exporter.sheet_name, DEFAULT_SHEET_NAME);
        assert!(!exporter.freeze_header);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("[import]\nactr = \"typo\"").is_err());
    }
}
