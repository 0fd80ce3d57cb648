//! URL rewrite handlers (`spec.md` §4.F).
//!
//! Two independent handlers, grounded on two companion files in the
//! original source:
//!
//! - [`NsmgrProxyEntryHandler`] — grounded on
//!   `pkg/networkservice/common/interdomainurl`: pops an `@URL` suffix off
//!   `NetworkServiceEndpointName`, injects `clientURL` into the call
//!   context, and restores the suffix on the way back so the caller still
//!   sees the interdomain name it sent.
//! - [`UrlRewriteRegistryHandler`] — grounded on
//!   `pkg/registry/common/seturl/nse_server.go`, with **REDESIGN FLAG #3**
//!   resolved as documented in `SPEC_FULL.md` §4.F: Register/Unregister pop
//!   the caller-supplied URL, forward this handler's local forwarding URL
//!   downstream (what a peer-internal hop dials), and restore the original
//!   URL onto the response the caller observes. Find streams are left
//!   unmodified — in this architecture a downstream peer that needs the
//!   forwarding URL learns it through `clientURL` (set by
//!   [`crate::interdomain::resolver`]), not by mutating stream items, so
//!   there is no second rewrite to undo on the way back to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::connection::Connection;
use crate::contract::CallContext;
use crate::error::Result;
use crate::pipeline::network_service::{NetworkServiceHandler, Next as NsNext};
use crate::pipeline::registry::{FindSink, Next as RegNext, Query, RegistryHandler};
use crate::registry::model::NetworkServiceEndpoint;

use super::name::{self, Authority};

pub struct NsmgrProxyEntryHandler;

#[async_trait]
impl NetworkServiceHandler for NsmgrProxyEntryHandler {
    async fn request(&self, mut conn: Connection, ctx: &mut CallContext, next: NsNext<'_>) -> Result<Connection> {
        let parsed = name::parse(&conn.network_service_endpoint_name)?;
        let suffix_url = match &parsed.authority {
            Some(Authority::Url(url)) => Some(url.clone()),
            _ => None,
        };

        if let Some(url) = &suffix_url {
            conn.network_service_endpoint_name = parsed.local.clone();
            ctx.client_url = Some(url.clone());
        }

        let mut response = next.request(conn, ctx).await?;

        if let Some(url) = suffix_url {
            response.network_service_endpoint_name = format!("{}@{}", parsed.local, url);
        }

        Ok(response)
    }

    async fn close(&self, conn: Connection, ctx: &mut CallContext, next: NsNext<'_>) -> Result<()> {
        next.close(conn, ctx).await
    }
}

/// Rewrites the `Url` of a registry entry to `local_forwarding_url` on the
/// way down, restoring the caller-supplied URL on the way back up.
pub struct UrlRewriteRegistryHandler {
    local_forwarding_url: Url,
}

impl UrlRewriteRegistryHandler {
    pub fn new(local_forwarding_url: Url) -> Self {
        Self { local_forwarding_url }
    }
}

#[async_trait]
impl RegistryHandler<NetworkServiceEndpoint> for UrlRewriteRegistryHandler {
    async fn register(
        &self,
        mut entry: NetworkServiceEndpoint,
        ctx: &mut CallContext,
        next: RegNext<'_, NetworkServiceEndpoint>,
    ) -> Result<NetworkServiceEndpoint> {
        let original = entry.url.take();
        entry.url = Some(self.local_forwarding_url.clone());
        let mut response = next.register(entry, ctx).await?;
        response.url = original;
        Ok(response)
    }

    async fn find(
        &self,
        query: Query<NetworkServiceEndpoint>,
        ctx: &mut CallContext,
        sink: Arc<dyn FindSink<NetworkServiceEndpoint>>,
        next: RegNext<'_, NetworkServiceEndpoint>,
    ) -> Result<()> {
        next.find(query, ctx, sink).await
    }

    async fn unregister(
        &self,
        mut entry: NetworkServiceEndpoint,
        ctx: &mut CallContext,
        next: RegNext<'_, NetworkServiceEndpoint>,
    ) -> Result<()> {
        entry.url = Some(self.local_forwarding_url.clone());
        next.unregister(entry, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::network_service::NetworkServiceChain;
    use crate::pipeline::registry::RegistryChain;

    struct CheckClientUrl {
        expected: Url,
    }

    #[async_trait]
    impl NetworkServiceHandler for CheckClientUrl {
        async fn request(&self, conn: Connection, ctx: &mut CallContext, next: NsNext<'_>) -> Result<Connection> {
            assert_eq!(ctx.client_url.as_ref(), Some(&self.expected));
            next.request(conn, ctx).await
        }
        async fn close(&self, conn: Connection, ctx: &mut CallContext, next: NsNext<'_>) -> Result<()> {
            next.close(conn, ctx).await
        }
    }

    #[tokio::test]
    async fn entry_handler_sets_client_url_and_restores_suffix_on_response() {
        let target = Url::parse("tcp://127.0.0.1:5000").unwrap();
        let handlers: Vec<Arc<dyn NetworkServiceHandler>> = vec![
            Arc::new(NsmgrProxyEntryHandler),
            Arc::new(CheckClientUrl { expected: target.clone() }),
        ];
        let chain = NetworkServiceChain::new("proxy", handlers);
        let mut ctx = CallContext::new();
        let mut conn = Connection::new("my-service");
        conn.network_service_endpoint_name = format!("final-endpoint@{target}");

        let response = chain.request(conn, &mut ctx).await.unwrap();
        assert_eq!(response.network_service_endpoint_name, format!("final-endpoint@{target}"));
    }

    #[tokio::test]
    async fn registry_handler_restores_original_url_on_register_response() {
        struct RecordingStore;
        #[async_trait]
        impl RegistryHandler<NetworkServiceEndpoint> for RecordingStore {
            async fn register(
                &self,
                entry: NetworkServiceEndpoint,
                _ctx: &mut CallContext,
                _next: RegNext<'_, NetworkServiceEndpoint>,
            ) -> Result<NetworkServiceEndpoint> {
                Ok(entry)
            }
            async fn find(
                &self,
                _q: Query<NetworkServiceEndpoint>,
                _ctx: &mut CallContext,
                _s: Arc<dyn FindSink<NetworkServiceEndpoint>>,
                _next: RegNext<'_, NetworkServiceEndpoint>,
            ) -> Result<()> {
                Ok(())
            }
            async fn unregister(
                &self,
                _entry: NetworkServiceEndpoint,
                _ctx: &mut CallContext,
                _next: RegNext<'_, NetworkServiceEndpoint>,
            ) -> Result<()> {
                Ok(())
            }
        }

        let local = Url::parse("tcp://10.0.0.1:6000").unwrap();
        let handlers: Vec<Arc<dyn RegistryHandler<NetworkServiceEndpoint>>> = vec![
            Arc::new(UrlRewriteRegistryHandler::new(local.clone())),
            Arc::new(RecordingStore),
        ];
        let chain = RegistryChain::new("registry", handlers);
        let mut ctx = CallContext::new();
        let original = Url::parse("tcp://192.168.1.1:7000").unwrap();
        let entry = NetworkServiceEndpoint {
            name: "ep-1".into(),
            url: Some(original.clone()),
            network_service_names: vec![],
            network_service_manager_name: String::new(),
            expiration: std::time::SystemTime::now(),
        };

        let response = chain.register(entry, &mut ctx).await.unwrap();
        assert_eq!(response.url, Some(original));
    }
}
