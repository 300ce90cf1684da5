//! # Remote Document Store
//!
//! Where replicated records end up: one JSON document per record, addressed
//! by owner, collection and record id.
//!
//! ```text
//! PUT    {base}/owners/{owner_id}/{collection}/{id}   body: flat JSON document
//! DELETE {base}/owners/{owner_id}/{collection}/{id}
//! ```
//!
//! Two implementations:
//! - [`HttpRemoteStore`] - JSON over HTTP via reqwest
//! - [`MemoryRemoteStore`] - in-process map with failure injection, used by
//!   tests and by the CLI's `--dry-remote` mode

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::error::{RemoteError, RemoteResult, SyncError, SyncResult};

/// A remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync + Debug {
    /// Creates or replaces a document.
    async fn put_document(
        &self,
        owner_id: &str,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> RemoteResult<()>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete_document(&self, owner_id: &str, collection: &str, id: &str)
        -> RemoteResult<()>;
}

// =============================================================================
// HTTP
// =============================================================================

/// Remote store speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl HttpRemoteStore {
    /// Creates a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "Remote URL must be an http(s) base URL, got: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(HttpRemoteStore {
            client,
            base,
            timeout,
        })
    }

    /// `{base}/owners/{owner}/{collection}/{id}`, each part percent-encoded.
    pub fn document_url(&self, owner_id: &str, collection: &str, id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["owners", owner_id, collection, id]);
        }
        url
    }

    fn classify(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout.as_millis() as u64)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn put_document(
        &self,
        owner_id: &str,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> RemoteResult<()> {
        let url = self.document_url(owner_id, collection, id);
        trace!(url = %url, "PUT document");

        self.client
            .put(url)
            .json(document)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| self.classify(e))?;

        Ok(())
    }

    async fn delete_document(
        &self,
        owner_id: &str,
        collection: &str,
        id: &str,
    ) -> RemoteResult<()> {
        let url = self.document_url(owner_id, collection, id);
        trace!(url = %url, "DELETE document");

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status().map_err(|e| self.classify(e))?;
        Ok(())
    }
}

// =============================================================================
// In-Memory
// =============================================================================

type DocumentKey = (String, String, String);

#[derive(Debug, Default)]
struct Failures {
    all: Option<RemoteError>,
    ids: HashMap<String, RemoteError>,
    panics: HashSet<String>,
    delay: Option<Duration>,
}

/// In-process remote store.
///
/// ## Failure Injection
/// ```rust,ignore
/// let remote = MemoryRemoteStore::new();
/// remote.fail_id("sale-1", RemoteError::Unavailable("down".into()));
/// remote.fail_all(RemoteError::Timeout(10));
/// remote.heal();
/// ```
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<HashMap<DocumentKey, Value>>,
    failures: Mutex<Failures>,
    puts: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        MemoryRemoteStore::default()
    }

    /// Every call fails with `error` until [`heal`](Self::heal).
    pub fn fail_all(&self, error: RemoteError) {
        self.failures().all = Some(error);
    }

    /// Calls for document `id` fail with `error`.
    pub fn fail_id(&self, id: impl Into<String>, error: RemoteError) {
        self.failures().ids.insert(id.into(), error);
    }

    /// Calls for document `id` panic.
    pub fn panic_on(&self, id: impl Into<String>) {
        self.failures().panics.insert(id.into());
    }

    /// Every call waits this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.failures().delay = Some(delay);
    }

    /// Clears every injected failure and delay.
    pub fn heal(&self) {
        *self.failures() = Failures::default();
    }

    pub fn document(&self, owner_id: &str, collection: &str, id: &str) -> Option<Value> {
        self.documents()
            .get(&(owner_id.to_string(), collection.to_string(), id.to_string()))
            .cloned()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Successful puts so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn failures(&self) -> std::sync::MutexGuard<'_, Failures> {
        self.failures.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn documents(&self) -> std::sync::MutexGuard<'_, HashMap<DocumentKey, Value>> {
        self.documents.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn check(&self, id: &str) -> RemoteResult<()> {
        let delay = self.failures().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (injected, panics) = {
            let failures = self.failures();
            let injected = failures
                .all
                .clone()
                .or_else(|| failures.ids.get(id).cloned());
            (injected, failures.panics.contains(id))
        };

        if panics {
            panic!("injected remote panic for {}", id);
        }
        match injected {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn put_document(
        &self,
        owner_id: &str,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> RemoteResult<()> {
        self.check(id).await?;

        self.documents().insert(
            (owner_id.to_string(), collection.to_string(), id.to_string()),
            document.clone(),
        );
        self.puts.fetch_add(1, Ordering::SeqCst);

        debug!(collection = %collection, id = %id, "Stored document in memory");
        Ok(())
    }

    async fn delete_document(
        &self,
        owner_id: &str,
        collection: &str,
        id: &str,
    ) -> RemoteResult<()> {
        self.check(id).await?;

        self.documents()
            .remove(&(owner_id.to_string(), collection.to_string(), id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_url() {
        let store = HttpRemoteStore::new("https://sync.example.com/api/", Duration::from_secs(1))
            .unwrap();
        let url = store.document_url("owner 1", "stockMovements", "m-1");
        assert_eq!(
            url.as_str(),
            "https://sync.example.com/api/owners/owner%201/stockMovements/m-1"
        );
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(HttpRemoteStore::new("ftp://example.com", Duration::from_secs(1)).is_err());
        assert!(HttpRemoteStore::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_memory_store_put_and_delete() {
        let store = MemoryRemoteStore::new();
        store
            .put_document("o", "products", "p1", &json!({"id": "p1"}))
            .await
            .unwrap();
        assert_eq!(store.document("o", "products", "p1"), Some(json!({"id": "p1"})));
        assert_eq!(store.put_count(), 1);

        store.delete_document("o", "products", "p1").await.unwrap();
        store.delete_document("o", "products", "p1").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection() {
        let store = MemoryRemoteStore::new();
        store.fail_id("p1", RemoteError::Unavailable("down".into()));

        let err = store
            .put_document("o", "products", "p1", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Unavailable("down".into()));
        store
            .put_document("o", "products", "p2", &json!({}))
            .await
            .unwrap();

        store.heal();
        store
            .put_document("o", "products", "p1", &json!({}))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }
}
