//! Client-side Request/Close chain: assigns path state for the client's own
//! segment and nothing else (`spec.md` §4.A — a client is "the first hop,
//! with no predecessor to validate against").

use std::sync::Arc;
use std::time::Duration;

use crate::handlers::UpdatePathHandler;
use crate::pipeline::network_service::{NetworkServiceChain, NetworkServiceHandler};

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

pub fn build(client_name: impl Into<String>) -> NetworkServiceChain {
    let handlers: Vec<Arc<dyn NetworkServiceHandler>> =
        vec![Arc::new(UpdatePathHandler::new(client_name, 0, DEFAULT_TOKEN_TTL))];
    NetworkServiceChain::new("client", handlers)
}
