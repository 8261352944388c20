use crate::errors::{AppError, AppResult};
use crate::models::{Record, SourceKind};
use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvExport {
    pub filename: String,
    pub mime_type: &'static str,
    pub content: String,
}

pub fn export_filename(kind: SourceKind, now: DateTime<Local>) -> String {
    format!("{}_{}.csv", kind.export_prefix(), now.format("%Y%m%d_%H%M%S"))
}

pub fn export_csv(kind: SourceKind, headers: &[String], records: &[&Record], now: DateTime<Local>) -> AppResult<CsvExport> {
    if headers.is_empty() {
        return Err(AppError::DataShape(format!("{kind} has no columns to export")));
    }
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record.values())?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| AppError::Io(error.to_string()))?;
    let content = String::from_utf8(bytes).map_err(|error| AppError::Internal(error.to_string()))?;
    Ok(CsvExport {
        filename: export_filename(kind, now),
        mime_type: "text/csv",
        content,
    })
}
