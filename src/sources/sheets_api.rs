use super::{RawTable, SheetLocation, SheetTransport, TransportFuture};
use crate::errors::{AppError, AppResult};
use crate::models::SourceKind;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_RANGE: &str = "A1:ZZ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetsCredential {
    ApiKey(String),
    Bearer(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub struct SheetsApiTransport {
    client: reqwest::Client,
    base_url: String,
    credential: Option<SheetsCredential>,
    ranges: HashMap<SourceKind, String>,
}

impl SheetsApiTransport {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        credential: Option<SheetsCredential>,
        ranges: HashMap<SourceKind, String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
            ranges,
        }
    }

    pub fn values_url(&self, kind: SourceKind, spreadsheet_id: &str) -> AppResult<Url> {
        let range = self
            .ranges
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(DEFAULT_RANGE);
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| AppError::Config(format!("invalid sheets api base url: {error}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("sheets api base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }

    async fn fetch(&self, kind: SourceKind, location: &SheetLocation) -> AppResult<RawTable> {
        let Some(credential) = &self.credential else {
            return Err(AppError::SourceUnavailable(
                "no Sheets API credential configured".to_string(),
            ));
        };
        let Some(spreadsheet_id) = location.spreadsheet_id.as_deref() else {
            return Err(AppError::SourceUnavailable(format!(
                "{} is not a Google Sheets link",
                kind.secret_name()
            )));
        };

        let url = self.values_url(kind, spreadsheet_id)?;
        let request = self.client.get(url).query(&[("majorDimension", "ROWS")]);
        let request = match credential {
            SheetsCredential::ApiKey(key) => request.query(&[("key", key.as_str())]),
            SheetsCredential::Bearer(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SourceUnavailable(format!(
                "Sheets API returned HTTP {status}: {}",
                body.trim()
            )));
        }
        let range: ValueRange = response.json().await?;
        Ok(values_to_table(range.values))
    }
}

impl SheetTransport for SheetsApiTransport {
    fn name(&self) -> &'static str {
        "sheets-api"
    }

    fn read<'a>(&'a self, kind: SourceKind, location: &'a SheetLocation) -> TransportFuture<'a> {
        Box::pin(self.fetch(kind, location))
    }
}

fn values_to_table(values: Vec<Vec<serde_json::Value>>) -> RawTable {
    let matrix = values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect();
    RawTable::from_matrix(matrix)
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}
