//! Registry server chain for a domain fronting a DNS-discoverable peer
//! (`spec.md` §4.F): resolves the `@domain` suffix to a `clientURL`, then
//! stores the entry under its local name.

use std::sync::Arc;

use crate::interdomain::DnsResolveRegistryHandler;
use crate::interdomain::resolver::DnsResolver;
use crate::pipeline::registry::RegistryChain;
use crate::registry::{NetworkServiceEndpoint, Store, StoreHandler};

pub fn build(
    resolver: Arc<dyn DnsResolver>,
    service: impl Into<String>,
    scheme: impl Into<String>,
) -> RegistryChain<NetworkServiceEndpoint> {
    let store = Arc::new(Store::<NetworkServiceEndpoint>::new());
    RegistryChain::new(
        "registry-dnsresolve",
        vec![
            Arc::new(DnsResolveRegistryHandler::new(resolver, service, scheme)),
            Arc::new(StoreHandler::new(store)),
        ],
    )
}
