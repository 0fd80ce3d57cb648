//! NSMgr's own Request/Close chain (`spec.md` §4.A, §4.B, §4.D): validates
//! the path, appends the manager's segment, serializes per connection id,
//! then arms the server-side eviction timer once a downstream Request
//! succeeds.
//!
//! `TimeoutHandler` needs a [`TimeoutController`] that itself needs the
//! chain it will later synthesize Closes through, so this assembly is built
//! in two passes: first the handler chain below the timer, then the
//! controller wrapping it, then the outward-facing serializing wrapper.

use std::sync::Arc;
use std::time::Duration;

use crate::contract::CallContext;
use crate::governance::TimeoutController;
use crate::handlers::{SerializingChain, TimeoutHandler, TokenCheckHandler, UpdatePathHandler};
use crate::pipeline::network_service::{NetworkServiceChain, NetworkServiceHandler};

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// `downstream` is everything past the manager: the forwarder to the
/// selected endpoint, including the endpoint chain itself.
pub fn build(manager_name: impl Into<String>, path_index: usize, downstream: Arc<NetworkServiceChain>) -> SerializingChain {
    let timed = Arc::new(NetworkServiceChain::new(
        "nsmgr-timed",
        vec![Arc::new(PassThroughToDownstream(downstream))],
    ));
    let timeout_controller = Arc::new(TimeoutController::new(timed.clone(), CallContext::new()));

    let handlers: Vec<Arc<dyn NetworkServiceHandler>> = vec![
        Arc::new(TokenCheckHandler),
        Arc::new(UpdatePathHandler::new(manager_name, path_index, DEFAULT_TOKEN_TTL)),
        Arc::new(TimeoutHandler::new(timeout_controller)),
        Arc::new(PassThroughToDownstream(timed)),
    ];
    let chain = Arc::new(NetworkServiceChain::new("nsmgr", handlers));
    SerializingChain::new(chain)
}

struct PassThroughToDownstream(Arc<NetworkServiceChain>);

#[async_trait::async_trait]
impl NetworkServiceHandler for PassThroughToDownstream {
    async fn request(
        &self,
        conn: crate::connection::Connection,
        ctx: &mut CallContext,
        _next: crate::pipeline::network_service::Next<'_>,
    ) -> crate::error::Result<crate::connection::Connection> {
        self.0.request(conn, ctx).await
    }

    async fn close(
        &self,
        conn: crate::connection::Connection,
        ctx: &mut CallContext,
        _next: crate::pipeline::network_service::Next<'_>,
    ) -> crate::error::Result<()> {
        self.0.close(conn, ctx).await
    }
}
