use super::{RawTable, SheetLocation, SheetTransport, TransportFuture};
use crate::errors::{AppError, AppResult};
use crate::models::SourceKind;
use csv::ReaderBuilder;

#[derive(Debug, Clone)]
pub struct CsvExportTransport {
    client: reqwest::Client,
}

impl CsvExportTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, location: &SheetLocation) -> AppResult<RawTable> {
        let url = location.csv_export_url();
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::SourceUnavailable(format!("CSV export returned HTTP {status}")));
        }
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/html"));
        if is_html {
            return Err(AppError::DataShape(
                "sheet answered with an HTML page; is it shared for public CSV export?".to_string(),
            ));
        }
        let body = response.text().await?;
        parse_csv(&body)
    }
}

impl SheetTransport for CsvExportTransport {
    fn name(&self) -> &'static str {
        "csv-export"
    }

    fn read<'a>(&'a self, _kind: SourceKind, location: &'a SheetLocation) -> TransportFuture<'a> {
        Box::pin(self.fetch(location))
    }
}

pub fn parse_csv(body: &str) -> AppResult<RawTable> {
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut matrix = Vec::new();
    for record in reader.records() {
        let record = record?;
        matrix.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(RawTable::from_matrix(matrix))
}
