//! The registry-side interdomain chain (`spec.md` §4.F): rewrites each
//! `NetworkServiceEndpoint`'s URL to this manager's own forwarding address
//! before the entry reaches peer-internal hops, restoring the original on
//! the response (REDESIGN FLAG #3), then hands off to the in-memory store.

use std::sync::Arc;

use url::Url;

use crate::interdomain::UrlRewriteRegistryHandler;
use crate::pipeline::registry::RegistryChain;
use crate::registry::{NetworkServiceEndpoint, Store, StoreHandler};

pub fn build(local_forwarding_url: Url) -> RegistryChain<NetworkServiceEndpoint> {
    let store = Arc::new(Store::<NetworkServiceEndpoint>::new());
    RegistryChain::new(
        "registry-interdomain",
        vec![
            Arc::new(UrlRewriteRegistryHandler::new(local_forwarding_url)),
            Arc::new(StoreHandler::new(store)),
        ],
    )
}
