use super::{RawTable, SheetLocation, SheetTransport, TransportFuture};
use crate::errors::AppResult;
use crate::models::SourceKind;
use std::sync::Arc;

type Loader = Arc<dyn Fn(SourceKind, &SheetLocation) -> AppResult<RawTable> + Send + Sync>;

#[derive(Clone)]
pub struct ConnectorTransport {
    loader: Loader,
}

impl ConnectorTransport {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn(SourceKind, &SheetLocation) -> AppResult<RawTable> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
        }
    }
}

impl SheetTransport for ConnectorTransport {
    fn name(&self) -> &'static str {
        "connector"
    }

    fn read<'a>(&'a self, kind: SourceKind, location: &'a SheetLocation) -> TransportFuture<'a> {
        Box::pin(async move { (self.loader)(kind, location) })
    }
}
