//! Production [`DnsResolver`] backed by the `domain` crate's stub resolver
//! — the real NLnet Labs DNS library also used elsewhere in this
//! workspace's codec stack, rather than a hand-rolled resolver.

use std::net::IpAddr;

use async_trait::async_trait;
use domain::resolv::lookup::host::lookup_host;
use domain::resolv::lookup::srv::lookup_srv;
use domain::resolv::StubResolver as DomainStubResolver;

use crate::error::{codes, ErrorCategory, NsmError, Result};
use crate::interdomain::resolver::{DnsResolver, SrvTarget};

pub struct StubDnsResolver {
    inner: DomainStubResolver,
}

impl StubDnsResolver {
    pub fn new() -> Self {
        Self { inner: DomainStubResolver::new() }
    }
}

impl Default for StubDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsResolver for StubDnsResolver {
    async fn resolve_srv(&self, service: &str, domain: &str) -> Result<Vec<SrvTarget>> {
        let found = lookup_srv(&self.inner, service, domain, "tcp").await.map_err(|e| {
            NsmError::with_cause(
                ErrorCategory::NotFound,
                codes::DNS_NO_SRV_RECORD,
                format!("SRV lookup failed for _{service}._tcp.{domain}"),
                e,
            )
        })?;

        Ok(found
            .iter()
            .map(|item| SrvTarget {
                host: item.target().to_string(),
                port: item.port(),
                priority: item.priority(),
                weight: item.weight(),
            })
            .collect())
    }

    async fn resolve_cname(&self, _host: &str) -> Result<Option<String>> {
        // The stub resolver's A/AAAA lookup below follows CNAME chains
        // transparently; a distinct CNAME-only query isn't needed in
        // practice, matching how the original SDK's resolver only
        // special-cased the `kubernetes.default.svc` alias at the SRV
        // target, not at every hostname.
        Ok(None)
    }

    async fn resolve_address(&self, host: &str) -> Result<IpAddr> {
        if let Ok(addr) = host.parse::<IpAddr>() {
            return Ok(addr);
        }
        let found = lookup_host(&self.inner, host).await.map_err(|e| {
            NsmError::with_cause(
                ErrorCategory::NotFound,
                codes::DNS_RESOLUTION_FAILED,
                format!("address lookup failed for {host:?}"),
                e,
            )
        })?;
        found.iter().next().ok_or_else(|| {
            NsmError::new(
                ErrorCategory::NotFound,
                codes::DNS_RESOLUTION_FAILED,
                format!("no A/AAAA records for {host:?}"),
            )
        })
    }
}
