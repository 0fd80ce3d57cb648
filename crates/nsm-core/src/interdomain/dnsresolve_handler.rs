//! Resolves the `@domain` suffix on a `NetworkServiceEndpoint`'s name to a
//! `clientURL` before the entry reaches peer-internal hops, grounded on
//! `pkg/registry/common/dnsresolve/nse_server.go` (confirmed against its
//! test, `nse_server_test.go`): `clientURL` is injected into the call
//! context identically for Register, Find, and Unregister, and the original
//! suffixed name is restored on the caller-visible response — the same
//! REDESIGN FLAG #3 rule `rewrite.rs` applies to URL suffixes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::contract::CallContext;
use crate::error::Result;
use crate::pipeline::registry::{FindSink, Next, Query, RegistryHandler};
use crate::registry::NetworkServiceEndpoint;

use super::name::{self, Authority};
use super::resolver::{resolve_client_url, DnsResolver};

pub struct DnsResolveRegistryHandler {
    resolver: Arc<dyn DnsResolver>,
    service: String,
    scheme: String,
}

impl DnsResolveRegistryHandler {
    pub fn new(resolver: Arc<dyn DnsResolver>, service: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            resolver,
            service: service.into(),
            scheme: scheme.into(),
        }
    }

    async fn resolve_and_strip(&self, name: &str, ctx: &mut CallContext) -> Result<Option<String>> {
        let parsed = name::parse(name)?;
        let Some(Authority::Domain(domain)) = &parsed.authority else {
            return Ok(None);
        };
        let resolved = resolve_client_url(self.resolver.as_ref(), &self.service, domain, &self.scheme).await?;
        ctx.client_url = Some(resolved);
        Ok(Some(parsed.local))
    }
}

#[async_trait]
impl RegistryHandler<NetworkServiceEndpoint> for DnsResolveRegistryHandler {
    async fn register(
        &self,
        mut entry: NetworkServiceEndpoint,
        ctx: &mut CallContext,
        next: Next<'_, NetworkServiceEndpoint>,
    ) -> Result<NetworkServiceEndpoint> {
        let original_name = entry.name.clone();
        if let Some(local) = self.resolve_and_strip(&original_name, ctx).await? {
            entry.name = local;
        }
        let mut response = next.register(entry, ctx).await?;
        response.name = original_name;
        Ok(response)
    }

    async fn find(
        &self,
        mut query: Query<NetworkServiceEndpoint>,
        ctx: &mut CallContext,
        sink: Arc<dyn FindSink<NetworkServiceEndpoint>>,
        next: Next<'_, NetworkServiceEndpoint>,
    ) -> Result<()> {
        if let Some(local) = self.resolve_and_strip(&query.filter.name, ctx).await? {
            query.filter.name = local;
        }
        next.find(query, ctx, sink).await
    }

    async fn unregister(
        &self,
        mut entry: NetworkServiceEndpoint,
        ctx: &mut CallContext,
        next: Next<'_, NetworkServiceEndpoint>,
    ) -> Result<()> {
        if let Some(local) = self.resolve_and_strip(&entry.name.clone(), ctx).await? {
            entry.name = local;
        }
        next.unregister(entry, ctx).await
    }
}
