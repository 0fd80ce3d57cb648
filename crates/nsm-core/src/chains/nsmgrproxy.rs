//! NSMgr-proxy's Request/Close chain (`spec.md` §4.F, REDESIGN FLAG #3):
//! the interdomain entry point that pops an `@URL` suffix off the
//! endpoint name, dials the resolved peer, and restores the suffix on the
//! way back so the caller's own view of the connection is unchanged.

use std::sync::Arc;

use crate::interdomain::NsmgrProxyEntryHandler;
use crate::pipeline::network_service::{NetworkServiceChain, NetworkServiceHandler};

/// `downstream` dials the peer NSMgr at `ctx.client_url`, set by
/// [`NsmgrProxyEntryHandler`]; it is the last link in the chain, so any
/// `next` it receives is already past the end of the handler array.
pub fn build(downstream: Arc<dyn NetworkServiceHandler>) -> NetworkServiceChain {
    let handlers: Vec<Arc<dyn NetworkServiceHandler>> = vec![Arc::new(NsmgrProxyEntryHandler), downstream];
    NetworkServiceChain::new("nsmgr-proxy", handlers)
}
