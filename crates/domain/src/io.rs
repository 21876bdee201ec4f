use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::DomainError, track::TrackResult};

pub const REPORT_FILE_NAME: &str = "suno_tags.xlsx";
pub const REPORT_HEADER: [&str; 3] = ["Filename", "Tag", "Score"];
const SCORE_FORMAT: &str = "0.0000";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReportRow {
    #[serde(rename = "Filename")]
    pub file_name: String,
    #[serde(rename = "Tag")]
    pub tag: String,
    #[serde(rename = "Score")]
    pub score: f64,
}

pub fn round_score(score: f32) -> f64 {
    (score as f64 * 10_000.0).round() / 10_000.0
}

pub trait ReportExporter: Send + Sync {
    /// Writes one row per (track, tag) pair and returns the report path.
    fn export(&self, output_folder: &Path, tracks: &[&TrackResult]) -> Result<PathBuf, DomainError>;
}

/// Single-sheet workbook with a header row and numeric scores.
pub struct XlsxReportExporter {
    file_name: String,
}

impl XlsxReportExporter {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Default for XlsxReportExporter {
    fn default() -> Self {
        Self::new(REPORT_FILE_NAME)
    }
}

impl ReportExporter for XlsxReportExporter {
    fn export(&self, output_folder: &Path, tracks: &[&TrackResult]) -> Result<PathBuf, DomainError> {
        let path = output_folder.join(&self.file_name);
        let mut workbook = Workbook::new();
        let score_format = Format::new().set_num_format(SCORE_FORMAT);
        let sheet = workbook.add_worksheet();
        for (col, title) in REPORT_HEADER.iter().enumerate() {
            sheet.write_string(0, col as u16, *title)?;
        }

        let mut row: u32 = 0;
        for track in tracks {
            for entry in track.tags.iter() {
                row += 1;
                sheet.write_string(row, 0, track.file_name.as_str())?;
                sheet.write_string(row, 1, entry.tag.as_str())?;
                let score = round_score(entry.score);
                if score.is_finite() {
                    sheet.write_number_with_format(row, 2, score, &score_format)?;
                } else {
                    // xlsx has no cell type for NaN or infinities
                    sheet.write_string(row, 2, score.to_string())?;
                }
            }
        }
        workbook.save(&path)?;
        debug!(path = %path.display(), rows = row, "report written");
        Ok(path)
    }
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        Some(Data::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn cell_score(cell: Option<&Data>) -> Result<f64, DomainError> {
    match cell {
        Some(Data::Float(value)) => Ok(*value),
        Some(Data::Int(value)) => Ok(*value as f64),
        Some(Data::String(text)) => text
            .parse()
            .map_err(|_| DomainError::Serialization(format!("score cell {text:?} is not a number"))),
        other => Err(DomainError::Serialization(format!(
            "unexpected score cell {other:?}"
        ))),
    }
}

/// Reads the first sheet of a report back, skipping the header row.
pub fn read_report(path: &Path) -> Result<Vec<ReportRow>, DomainError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DomainError::Serialization("report has no sheets".into()))??;
    range
        .rows()
        .skip(1)
        .map(|cells| -> Result<ReportRow, DomainError> {
            Ok(ReportRow {
                file_name: cell_text(cells.first()),
                tag: cell_text(cells.get(1)),
                score: cell_score(cells.get(2))?,
            })
        })
        .collect()
}
