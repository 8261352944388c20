pub mod connector;
pub mod csv_export;
pub mod sheets_api;

pub use connector::ConnectorTransport;
pub use csv_export::CsvExportTransport;
pub use sheets_api::{SheetsApiTransport, SheetsCredential};

use crate::columns::ColumnMap;
use crate::config::{self, DashboardConfig, TransportKind};
use crate::errors::{AppError, AppResult};
use crate::models::{Record, Snapshot, SourceKind};
use crate::redaction::redact;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

static SPREADSHEET_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_\-]+)").expect("valid regex"));
static SHEET_GID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#&?]gid=([0-9]+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLocation {
    pub url: String,
    pub spreadsheet_id: Option<String>,
    pub gid: Option<String>,
}

impl SheetLocation {
    pub fn parse(url: &str) -> Self {
        let url = url.trim().to_string();
        let spreadsheet_id = SPREADSHEET_ID
            .captures(&url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        let gid = SHEET_GID
            .captures(&url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        Self {
            url,
            spreadsheet_id,
            gid,
        }
    }

    pub fn csv_export_url(&self) -> String {
        match &self.spreadsheet_id {
            Some(id) => {
                let mut url = format!("https://docs.google.com/spreadsheets/d/{id}/export?format=csv");
                if let Some(gid) = &self.gid {
                    url.push_str("&gid=");
                    url.push_str(gid);
                }
                url
            }
            None => self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_matrix(mut matrix: Vec<Vec<String>>) -> Self {
        if matrix.is_empty() {
            return Self::default();
        }
        let headers = matrix.remove(0);
        let width = headers.len();
        let rows = matrix
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }
}

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = AppResult<RawTable>> + Send + 'a>>;

pub trait SheetTransport: Send + Sync {
    fn name(&self) -> &'static str;
    fn read<'a>(&'a self, kind: SourceKind, location: &'a SheetLocation) -> TransportFuture<'a>;
}

pub fn build_transport(config: &DashboardConfig, client: reqwest::Client) -> AppResult<Arc<dyn SheetTransport>> {
    match config.transport {
        TransportKind::CsvExport => Ok(Arc::new(CsvExportTransport::new(client))),
        TransportKind::SheetsApi => {
            let api = &config.sheets_api;
            let mut credential = api.access_token.clone().map(SheetsCredential::Bearer);
            if credential.is_none() && api.use_keyring {
                match config::keyring_sheets_token() {
                    Ok(token) => credential = token.map(SheetsCredential::Bearer),
                    Err(error) => tracing::warn!(error = %error, "keyring lookup for sheets token failed"),
                }
            }
            if credential.is_none() {
                credential = api.api_key.clone().map(SheetsCredential::ApiKey);
            }
            let ranges = SourceKind::ALL
                .iter()
                .filter_map(|kind| api.range_for(*kind).map(|range| (*kind, range.to_string())))
                .collect();
            Ok(Arc::new(SheetsApiTransport::new(client, api.base_url(), credential, ranges)))
        }
        TransportKind::Connector => Err(AppError::Config(
            "connector transport must be supplied by the host".to_string(),
        )),
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Arc<Snapshot>,
    stored_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    entries: Arc<Mutex<HashMap<SourceKind, CacheEntry>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, kind: SourceKind) -> Option<Arc<Snapshot>> {
        self.get_at(kind, Instant::now()).await
    }

    pub async fn get_at(&self, kind: SourceKind, now: Instant) -> Option<Arc<Snapshot>> {
        let entries = self.entries.lock().await;
        let entry = entries.get(&kind)?;
        if now.saturating_duration_since(entry.stored_at) < kind.cache_ttl() {
            Some(entry.snapshot.clone())
        } else {
            None
        }
    }

    pub async fn insert(&self, snapshot: Arc<Snapshot>) {
        self.insert_at(snapshot, Instant::now()).await;
    }

    pub async fn insert_at(&self, snapshot: Arc<Snapshot>, stored_at: Instant) {
        let mut entries = self.entries.lock().await;
        entries.insert(snapshot.kind, CacheEntry { snapshot, stored_at });
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

pub struct SheetSource {
    transport: Arc<dyn SheetTransport>,
    locations: HashMap<SourceKind, SheetLocation>,
    cache: SourceCache,
}

impl SheetSource {
    pub fn new(transport: Arc<dyn SheetTransport>, config: &DashboardConfig) -> Self {
        let locations = SourceKind::ALL
            .iter()
            .filter_map(|kind| config.sheet_url(*kind).map(|url| (*kind, SheetLocation::parse(url))))
            .collect();
        Self::with_locations(transport, locations)
    }

    pub fn with_locations(transport: Arc<dyn SheetTransport>, locations: HashMap<SourceKind, SheetLocation>) -> Self {
        Self {
            transport,
            locations,
            cache: SourceCache::new(),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn is_configured(&self, kind: SourceKind) -> bool {
        self.locations.contains_key(&kind)
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Cached snapshot for `kind`, or a fresh read. Never fails: problems
    /// come back as an unavailable snapshot carrying the redacted error, and
    /// are not cached.
    pub async fn fetch(&self, kind: SourceKind) -> Arc<Snapshot> {
        match self.try_fetch(kind).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                let message = redact(&error.to_string());
                tracing::warn!(
                    source = %kind,
                    transport = self.transport.name(),
                    error = %message,
                    "source fetch failed, serving empty snapshot"
                );
                Arc::new(Snapshot::unavailable(kind, message))
            }
        }
    }

    pub async fn try_fetch(&self, kind: SourceKind) -> AppResult<Arc<Snapshot>> {
        if let Some(snapshot) = self.cache.get(kind).await {
            tracing::debug!(source = %kind, "snapshot cache hit");
            return Ok(snapshot);
        }

        let location = self.locations.get(&kind).ok_or_else(|| {
            AppError::SourceUnavailable(format!("{} not found in secrets", kind.secret_name()))
        })?;

        tracing::debug!(source = %kind, transport = self.transport.name(), "reading sheet");
        let table = self.transport.read(kind, location).await?;
        let snapshot = Arc::new(normalize(kind, table, Utc::now()));
        tracing::info!(source = %kind, records = snapshot.len(), "sheet snapshot loaded");
        self.cache.insert(snapshot.clone()).await;
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        self.cache.clear().await;
        tracing::debug!("snapshot cache cleared");
    }

}

pub fn normalize(kind: SourceKind, table: RawTable, fetched_at: DateTime<Utc>) -> Snapshot {
    let width = table.headers.len();
    let columns = Arc::new(ColumnMap::new(kind, table.headers));
    let records = table
        .rows
        .into_iter()
        .map(|mut row| {
            row.resize(width, String::new());
            Record::new(kind, row, columns.clone())
        })
        .collect();
    Snapshot {
        kind,
        columns,
        records,
        fetched_at,
        load_error: None,
    }
}
