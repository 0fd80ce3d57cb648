//! Carries per-connection handler-private state across the Request/Close
//! boundary, keyed by connection id, grounded on
//! `pkg/networkservice/common/metadata`: a hop that allocates a resource on
//! Request (e.g. a dataplane interface) stores whatever it needs to tear it
//! down later, since Close arrives as a separate call with its own
//! `Connection` value.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::connection::{Connection, SegmentId};
use crate::contract::CallContext;
use crate::error::Result;
use crate::pipeline::network_service::{NetworkServiceHandler, Next};

/// A typed slot a downstream handler can read back on Close. Opaque to this
/// handler; it only keys storage by connection id and clears it once Close
/// has run, so a leaked id can't accumulate entries past connection
/// lifetime.
pub trait Metadata: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Metadata for T {}

pub struct MetadataStore<T: Metadata> {
    entries: DashMap<SegmentId, Arc<T>>,
}

impl<T: Metadata> MetadataStore<T> {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn get(&self, id: SegmentId) -> Option<Arc<T>> {
        self.entries.get(&id).map(|e| e.clone())
    }

    pub fn set(&self, id: SegmentId, value: T) {
        self.entries.insert(id, Arc::new(value));
    }

    pub fn remove(&self, id: SegmentId) -> Option<Arc<T>> {
        self.entries.remove(&id).map(|(_, v)| v)
    }
}

impl<T: Metadata> Default for MetadataStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the entry for a connection's id on Close, regardless of what a
/// downstream handler wrote; a handler that needs the value on Close reads
/// it with its own `MetadataStore` reference before this one runs.
pub struct MetadataClearHandler<T: Metadata> {
    store: Arc<MetadataStore<T>>,
}

impl<T: Metadata> MetadataClearHandler<T> {
    pub fn new(store: Arc<MetadataStore<T>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<T: Metadata> NetworkServiceHandler for MetadataClearHandler<T> {
    async fn request(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<Connection> {
        next.request(conn, ctx).await
    }

    async fn close(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<()> {
        if let Some(id) = conn.id() {
            self.store.remove(id);
        }
        next.close(conn, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[tokio::test]
    async fn close_clears_stored_entry() {
        let store: Arc<MetadataStore<&'static str>> = Arc::new(MetadataStore::new());
        let mut conn = Connection::new("svc");
        conn.path.advance(0, "nsmgr-1", "tok".into(), SystemTime::now()).unwrap();
        let id = conn.id().unwrap();
        store.set(id, "allocated-resource");

        let handlers: Vec<Arc<dyn NetworkServiceHandler>> = vec![Arc::new(MetadataClearHandler::new(store.clone()))];
        let chain = crate::pipeline::network_service::NetworkServiceChain::new("chain", handlers);
        let mut ctx = CallContext::new();
        chain.close(conn, &mut ctx).await.unwrap();

        assert!(store.get(id).is_none());
    }
}
