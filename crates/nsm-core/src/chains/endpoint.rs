//! Endpoint-side Request/Close chain: validates the caller's path, appends
//! the endpoint's own segment, and pins a mechanism preference
//! (`spec.md` §4.A, §4.C, §8 S6).

use std::sync::Arc;
use std::time::Duration;

use crate::connection::Mechanism;
use crate::handlers::{MechanismPreferenceHandler, TokenCheckHandler, UpdatePathHandler};
use crate::pipeline::network_service::{NetworkServiceChain, NetworkServiceHandler};

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

pub fn build(endpoint_name: impl Into<String>, path_index: usize, mechanism: Mechanism) -> NetworkServiceChain {
    let handlers: Vec<Arc<dyn NetworkServiceHandler>> = vec![
        Arc::new(TokenCheckHandler),
        Arc::new(UpdatePathHandler::new(endpoint_name, path_index, DEFAULT_TOKEN_TTL)),
        Arc::new(MechanismPreferenceHandler::new(mechanism)),
    ];
    NetworkServiceChain::new("endpoint", handlers)
}
