#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common fixtures for compiler integration tests.
//!
//! Metadata comes from the real [`StaticMetadataStore`]; the wrappers below
//! add call recording, failures and latency around it.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use dataselector::metadata::{LinkMetadata, LinkTypeSettings};
use dataselector::selector::{Connection, ConnectionRow, Field, Selector};
use dataselector::{
    MetadataStore, SelectorCompiler, SelectorError, SelectorRequest, SelectorResult,
    StaticMetadataStore,
};

/// Shop metadata used across tests.
///
/// - `variant` → `product`: parent_item_id link (type 1)
/// - `product` → `category`: dedicated link table (type 9)
/// - `review` → `product`: shared link table (type 4)
/// - `order` items live in `shop_`-prefixed tables
pub fn shop_metadata() -> StaticMetadataStore {
    StaticMetadataStore::default()
        .with_entity("order", "shop")
        .with_link(link(1, "variant", "product", true, false))
        .with_link(link(9, "product", "category", false, true))
        .with_link(link(4, "review", "product", false, false))
}

pub fn link(
    link_type: i32,
    source: &str,
    destination: &str,
    use_item_parent_id: bool,
    use_dedicated_table: bool,
) -> LinkMetadata {
    LinkMetadata {
        link_type,
        source_entity_type: source.to_string(),
        destination_entity_type: destination.to_string(),
        use_item_parent_id,
        use_dedicated_table,
    }
}

/// Compiler over the shop metadata.
pub fn shop_compiler() -> SelectorCompiler {
    SelectorCompiler::new(Arc::new(shop_metadata()))
}

/// Request for `main` with the given connection groups.
pub fn request(main: ConnectionRow) -> SelectorRequest {
    SelectorRequest::for_selector(Selector::new(main))
}

pub fn group(rows: Vec<ConnectionRow>) -> Connection {
    Connection::new("group", rows)
}

pub fn field(name: &str) -> Field {
    Field::new(name)
}

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Prefix(String),
    Link(i32, String, String),
}

/// Store wrapper recording every call that reaches it.
pub struct RecordingStore<S> {
    inner: S,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> (Self, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl<S: MetadataStore> MetadataStore for RecordingStore<S> {
    async fn table_prefix(&self, entity_name: &str) -> SelectorResult<String> {
        self.calls.lock().push(Call::Prefix(entity_name.to_string()));
        self.inner.table_prefix(entity_name).await
    }

    async fn link_settings(
        &self,
        link_type: i32,
        source: &str,
        destination: &str,
    ) -> SelectorResult<LinkTypeSettings> {
        self.calls.lock().push(Call::Link(
            link_type,
            source.to_string(),
            destination.to_string(),
        ));
        self.inner.link_settings(link_type, source, destination).await
    }
}

/// Store whose backend is unreachable.
pub struct UnreachableStore;

#[async_trait]
impl MetadataStore for UnreachableStore {
    async fn table_prefix(&self, _entity_name: &str) -> SelectorResult<String> {
        Err(SelectorError::Metadata(sqlx::Error::PoolTimedOut))
    }

    async fn link_settings(
        &self,
        _link_type: i32,
        _source: &str,
        _destination: &str,
    ) -> SelectorResult<LinkTypeSettings> {
        Err(SelectorError::Metadata(sqlx::Error::PoolTimedOut))
    }
}

/// Store that answers only after `delay`.
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl MetadataStore for SlowStore {
    async fn table_prefix(&self, _entity_name: &str) -> SelectorResult<String> {
        tokio::time::sleep(self.delay).await;
        Ok(String::new())
    }

    async fn link_settings(
        &self,
        link_type: i32,
        _source: &str,
        _destination: &str,
    ) -> SelectorResult<LinkTypeSettings> {
        tokio::time::sleep(self.delay).await;
        Ok(LinkTypeSettings::fallback(link_type))
    }
}

/// Formatted log output collected by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Collect this thread's events at `debug` and above until the guard drops.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
