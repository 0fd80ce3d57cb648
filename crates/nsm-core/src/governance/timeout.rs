//! Server-side connection timeout/eviction controller (`spec.md` §4.D).
//!
//! Associates each accepted connection with a timer derived from the
//! minimum `Expires` across its path segments; on fire, synthesizes a Close
//! through the downstream chain. The timer resets on every successful
//! Request for that connection. Close for an unknown id is a silent no-op
//! (`spec.md` §7 — `NotFound` absorbed here, surfaced elsewhere).

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tracing::warn;

use crate::connection::{Connection, SegmentId};
use crate::contract::{CallContext, Cancellation};
use crate::error::Result;
use crate::pipeline::network_service::NetworkServiceChain;

struct Timer {
    cancellation: Cancellation,
}

/// Evicts connections whose registrant stops refreshing, by racing a
/// per-connection timer against the path's minimum segment expiry.
pub struct TimeoutController {
    downstream: Arc<NetworkServiceChain>,
    timers: Arc<DashMap<SegmentId, Timer>>,
    /// The Close context used for synthesized evictions outlives any
    /// individual Request's context, supplied once at construction
    /// (`spec.md` §5), so eviction can proceed after the client disconnects.
    close_context: Arc<std::sync::Mutex<CallContext>>,
}

impl TimeoutController {
    pub fn new(downstream: Arc<NetworkServiceChain>, close_context: CallContext) -> Self {
        Self {
            downstream,
            timers: Arc::new(DashMap::new()),
            close_context: Arc::new(std::sync::Mutex::new(close_context)),
        }
    }

    /// Called after a successful Request: (re)arms the eviction timer for
    /// this connection from the minimum expiry across its path.
    pub fn arm(&self, conn: &Connection) {
        let Some(id) = conn.id() else { return };
        let Some(min_expiry) = conn
            .path
            .segments()
            .iter()
            .map(|s| s.expires)
            .min()
        else {
            return;
        };

        if let Some(previous) = self.timers.get(&id) {
            previous.cancellation.cancel();
        }

        let cancellation = Cancellation::new();
        self.timers.insert(id, Timer { cancellation: cancellation.clone() });

        let downstream = self.downstream.clone();
        let timers = self.timers.clone();
        let close_context = self.close_context.clone();
        let conn = conn.clone();

        tokio::spawn(async move {
            let wait = min_expiry
                .duration_since(SystemTime::now())
                .unwrap_or(std::time::Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = wait_cancelled(&cancellation) => return,
            }
            if cancellation.is_cancelled() {
                return;
            }

            timers.remove(&id);
            let mut ctx = close_context.lock().unwrap().child();
            if let Err(err) = downstream.close(conn, &mut ctx).await {
                warn!(error = %err, "synthesized eviction close failed");
            }
        });
    }

    /// Cancels the eviction timer for `id`, if any. A Close for an unknown
    /// id is a no-op, satisfying the idempotence requirement of `spec.md`
    /// §4.D.
    pub fn disarm(&self, id: SegmentId) {
        if let Some((_, timer)) = self.timers.remove(&id) {
            timer.cancellation.cancel();
        }
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }
}

async fn wait_cancelled(cancellation: &Cancellation) {
    loop {
        if cancellation.is_cancelled() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::network_service::{NetworkServiceHandler, Next};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    struct CountingClose(Arc<AtomicUsize>);

    #[async_trait]
    impl NetworkServiceHandler for CountingClose {
        async fn request(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<Connection> {
            next.request(conn, ctx).await
        }
        async fn close(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            next.close(conn, ctx).await
        }
    }

    fn connection_expiring_in(millis: u64) -> Connection {
        let mut conn = Connection::new("svc");
        conn.path
            .advance(0, "nsmgr-1", "tok".into(), SystemTime::now() + Duration::from_millis(millis))
            .unwrap();
        conn
    }

    #[tokio::test(start_paused = true)]
    async fn fires_close_when_min_expiry_elapses() {
        let closes = Arc::new(AtomicUsize::new(0));
        let chain = Arc::new(NetworkServiceChain::new(
            "eviction",
            vec![Arc::new(CountingClose(closes.clone()))],
        ));
        let controller = TimeoutController::new(chain, CallContext::new());
        let conn = connection_expiring_in(100);
        controller.arm(&conn);

        tokio::time::advance(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disarm_on_unknown_id_is_a_no_op() {
        let chain = Arc::new(NetworkServiceChain::new("eviction", vec![]));
        let controller = TimeoutController::new(chain, CallContext::new());
        controller.disarm(Uuid::new_v4());
        assert_eq!(controller.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_previous_timer() {
        let closes = Arc::new(AtomicUsize::new(0));
        let chain = Arc::new(NetworkServiceChain::new(
            "eviction",
            vec![Arc::new(CountingClose(closes.clone()))],
        ));
        let controller = TimeoutController::new(chain, CallContext::new());
        let mut conn = connection_expiring_in(100);
        controller.arm(&conn);

        tokio::time::advance(Duration::from_millis(50)).await;
        conn.path
            .advance(0, "nsmgr-1", "tok2".into(), SystemTime::now() + Duration::from_millis(500))
            .unwrap();
        controller.arm(&conn);

        tokio::time::advance(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        assert_eq!(closes.load(Ordering::SeqCst), 0, "old timer fired despite rearm");
    }
}
