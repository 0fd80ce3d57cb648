//! The in-memory registry store (`spec.md` §4.E): Register/Find/Unregister
//! over a keyed table, with watch fan-out.
//!
//! Grounded on `pkg/registry/memory/nse_server.go`, corrected per
//! **REDESIGN FLAG #1** in `spec.md` Design Notes §9: the original's watch
//! loop calls `Send` unconditionally once per received event and then a
//! second time inside the match check, double-delivering every matching
//! event. This store's fan-out calls `send` exactly once, iff the event
//! matches the watcher's query.

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

use crate::contract::CallContext;
use crate::error::Result as NsmResult;
use crate::pipeline::registry::{FindSink, Next, Query, RegistryHandler};

use super::model::{epoch_zero, RegistryEntry};
use super::query::Matches;
use super::watch::{watch_channel, WatchReceiver, WatchSender};

const DEFAULT_WATCH_CAPACITY: usize = 256;

struct Watcher<E> {
    query: E,
    sender: WatchSender<E>,
}

/// In-memory table of one entity type (`NetworkService` or
/// `NetworkServiceEndpoint`), keyed by name.
pub struct Store<E> {
    table: DashMap<String, E>,
    watchers: Arc<AsyncMutex<Vec<Watcher<E>>>>,
    watch_capacity: usize,
}

impl<E> Store<E>
where
    E: RegistryEntry + Matches,
{
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
            watchers: Arc::new(AsyncMutex::new(Vec::new())),
            watch_capacity: DEFAULT_WATCH_CAPACITY,
        }
    }

    /// Upserts by name and fans the new value out to every open watcher
    /// whose query matches it.
    pub async fn register(&self, entry: E) -> E {
        self.table.insert(entry.name().to_string(), entry.clone());
        self.fan_out(entry.clone()).await;
        entry
    }

    /// Removes by name and emits a synthetic event with `expiration` set to
    /// the Unix epoch, so watchers can distinguish deletion from an
    /// ordinary update.
    pub async fn unregister(&self, mut entry: E) {
        self.table.remove(entry.name());
        entry.set_expiration(epoch_zero());
        self.fan_out(entry).await;
    }

    /// Snapshots every currently-matching entry. If `watch` is set, also
    /// registers a subscription that receives every future matching event
    /// until the returned receiver is dropped or the store closes it.
    pub async fn find(&self, query: E, watch: bool) -> (Vec<E>, Option<WatchReceiver<E>>) {
        let snapshot: Vec<E> = self
            .table
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        if !watch {
            return (snapshot, None);
        }

        let (tx, rx) = watch_channel(self.watch_capacity);
        self.watchers.lock().await.push(Watcher { query, sender: tx });
        (snapshot, Some(rx))
    }

    async fn fan_out(&self, event: E) {
        let watchers = self.watchers.lock().await;
        for watcher in watchers.iter() {
            if watcher.query.matches(&event) {
                watcher.sender.send(event.clone()).await;
            }
        }
    }

    pub fn snapshot_expiration(&self, name: &str) -> Option<SystemTime> {
        self.table.get(name).map(|e| e.expiration())
    }
}

impl<E> Default for Store<E>
where
    E: RegistryEntry + Matches,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal [`RegistryHandler`] plugging a [`Store`] into a registry chain:
/// the entity table itself is always the last link, never forwarding to
/// `next`. A live watch subscription is drained into `sink` on its own
/// spawned task so `find` can return as soon as the initial snapshot is
/// delivered, stopping once `ctx`'s cancellation fires or the sink errors.
pub struct StoreHandler<E> {
    store: Arc<Store<E>>,
}

impl<E> StoreHandler<E>
where
    E: RegistryEntry + Matches,
{
    pub fn new(store: Arc<Store<E>>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl<E> RegistryHandler<E> for StoreHandler<E>
where
    E: RegistryEntry + Matches,
{
    async fn register(&self, entry: E, _ctx: &mut CallContext, _next: Next<'_, E>) -> NsmResult<E> {
        Ok(self.store.register(entry).await)
    }

    async fn find(
        &self,
        query: Query<E>,
        ctx: &mut CallContext,
        sink: Arc<dyn FindSink<E>>,
        _next: Next<'_, E>,
    ) -> NsmResult<()> {
        let (snapshot, watch_rx) = self.store.find(query.filter, query.watch).await;
        for entry in snapshot {
            sink.send(entry).await?;
        }

        if let Some(mut rx) = watch_rx {
            let cancellation = ctx.cancellation.clone();
            tokio::spawn(async move {
                while let Some(entry) = rx.recv().await {
                    if cancellation.is_cancelled() {
                        return;
                    }
                    if sink.send(entry).await.is_err() {
                        return;
                    }
                }
            });
        }
        Ok(())
    }

    async fn unregister(&self, entry: E, _ctx: &mut CallContext, _next: Next<'_, E>) -> NsmResult<()> {
        self.store.unregister(entry).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::model::NetworkServiceEndpoint;
    use std::time::Duration;

    fn nse(name: &str) -> NetworkServiceEndpoint {
        NetworkServiceEndpoint {
            name: name.into(),
            url: None,
            network_service_names: vec!["svc".into()],
            network_service_manager_name: String::new(),
            expiration: SystemTime::now() + Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn register_is_visible_in_find_snapshot() {
        let store: Store<NetworkServiceEndpoint> = Store::new();
        store.register(nse("ep-1")).await;
        let query = NetworkServiceEndpoint { name: String::new(), ..nse("") };
        let (snapshot, _) = store.find(query, false).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "ep-1");
    }

    #[tokio::test]
    async fn matching_event_is_delivered_exactly_once() {
        let store: Store<NetworkServiceEndpoint> = Store::new();
        let query = nse("ep-1");
        let (_, rx) = store.find(query, true).await;
        let mut rx = rx.unwrap();
        store.register(nse("ep-1")).await;

        let first = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .unwrap();
        assert!(first.is_some());

        // No second delivery should be queued for the same Register call.
        let second = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(second.is_err(), "watcher received a duplicate send");
    }

    #[tokio::test]
    async fn unregister_emits_epoch_zero_expiration() {
        let store: Store<NetworkServiceEndpoint> = Store::new();
        let query = nse("ep-1");
        let (_, rx) = store.find(query.clone(), true).await;
        let mut rx = rx.unwrap();
        store.register(nse("ep-1")).await;
        rx.recv().await;

        store.unregister(nse("ep-1")).await;
        let deletion = rx.recv().await.unwrap();
        assert_eq!(deletion.expiration, epoch_zero());
    }

    #[tokio::test]
    async fn non_matching_watcher_receives_nothing() {
        let store: Store<NetworkServiceEndpoint> = Store::new();
        let query = nse("ep-other");
        let (_, rx) = store.find(query, true).await;
        let mut rx = rx.unwrap();
        store.register(nse("ep-1")).await;
        let result = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(result.is_err());
    }

    struct CollectingSink {
        seen: AsyncMutex<Vec<NetworkServiceEndpoint>>,
    }

    #[async_trait::async_trait]
    impl FindSink<NetworkServiceEndpoint> for CollectingSink {
        async fn send(&self, entry: NetworkServiceEndpoint) -> NsmResult<()> {
            self.seen.lock().await.push(entry);
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_handler_delivers_snapshot_through_sink() {
        let store = Arc::new(Store::<NetworkServiceEndpoint>::new());
        store.register(nse("ep-1")).await;
        let handler = StoreHandler::new(store);

        let sink = Arc::new(CollectingSink { seen: AsyncMutex::new(Vec::new()) });
        let chain = crate::pipeline::registry::RegistryChain::new(
            "registry",
            vec![Arc::new(handler) as Arc<dyn RegistryHandler<NetworkServiceEndpoint>>],
        );
        let mut ctx = CallContext::new();
        chain
            .find(Query { filter: nse(""), watch: false }, &mut ctx, sink.clone())
            .await
            .unwrap();
        assert_eq!(sink.seen.lock().await.len(), 1);
    }
}
