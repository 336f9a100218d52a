//! # medexam-xlsx
//!
//! XLSX backends for medexam result sheets.
//!
//! This crate provides:
//! - `ExcelExporter`: campaign results and blank import templates as XLSX bytes
//! - `read_sheet`: first worksheet of an uploaded workbook as a `SheetGrid`
//! - `import_workbook`: header parsing and result reconciliation in one call
//!
//! ## Example
//!
//! ```rust,ignore
//! use medexam_core::ImportOptions;
//! use medexam_xlsx::{import_workbook, ExcelExporter};
//!
//! let xlsx = ExcelExporter::new().export_campaign(&store, campaign_id)?;
//! std::fs::write("results.xlsx", &xlsx)?;
//!
//! let uploaded = std::fs::read("filled.xlsx")?;
//! let summary = import_workbook(&mut store, &uploaded, campaign_id, &ImportOptions::default())?;
//! ```

pub mod reader;
pub mod writer;

pub use reader::{import_workbook, read_sheet};
pub use writer::ExcelExporter;

use medexam_core::ExamError;
use thiserror::Error;

/// Workbook export/import error
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("Failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook contains no sheets")]
    NoSheets,

    #[error("Position ({row}, {col}) is outside the worksheet")]
    OutOfRange { row: usize, col: usize },

    #[error(transparent)]
    Exam(#[from] ExamError),
}
