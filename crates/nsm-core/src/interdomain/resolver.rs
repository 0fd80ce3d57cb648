//! DNS resolver handler support (`spec.md` §4.F): resolves
//! `_<service>._tcp.<domain>` to a host/port via SRV, then the host to an IP
//! via A/AAAA, optionally following one CNAME first.
//!
//! The resolution seam is a plain trait so production code can drive the
//! real `domain` crate's stub resolver while tests use an in-memory fake —
//! directly grounding `sandbox.FakeDNSResolver` from
//! `pkg/tools/sandbox/fake_resolver.go`, reimplemented as a small trait
//! rather than a sandbox-wide test harness.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::error::{codes, ErrorCategory, NsmError, Result};

/// One SRV answer: the dialable host/port for a service instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SrvTarget {
    pub host: String,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
}

#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve_srv(&self, service: &str, domain: &str) -> Result<Vec<SrvTarget>>;
    async fn resolve_cname(&self, host: &str) -> Result<Option<String>>;
    async fn resolve_address(&self, host: &str) -> Result<IpAddr>;
}

/// Resolves `_<service>._tcp.<domain>` to a `clientURL`, following the rule
/// in `spec.md` §4.F: take the SRV target, optionally follow one CNAME
/// (e.g. `kubernetes.default.svc`), then resolve to an address.
pub async fn resolve_client_url(
    resolver: &dyn DnsResolver,
    service: &str,
    domain: &str,
    scheme: &str,
) -> Result<Url> {
    let mut targets = resolver.resolve_srv(service, domain).await?;
    targets.sort_by(|a, b| a.priority.cmp(&b.priority).then(b.weight.cmp(&a.weight)));
    let target = targets.into_iter().next().ok_or_else(|| {
        NsmError::new(
            ErrorCategory::NotFound,
            codes::DNS_NO_SRV_RECORD,
            format!("no SRV record for _{service}._tcp.{domain}"),
        )
    })?;

    let resolved_host = match resolver.resolve_cname(&target.host).await? {
        Some(canonical) => canonical,
        None => target.host.clone(),
    };

    let addr = resolver.resolve_address(&resolved_host).await?;
    let url_str = format!("{scheme}://{addr}:{}", target.port);
    Url::parse(&url_str).map_err(|e| {
        NsmError::with_cause(
            ErrorCategory::Internal,
            codes::DNS_RESOLUTION_FAILED,
            format!("resolved address did not form a valid URL: {url_str:?}"),
            e,
        )
    })
}

/// In-memory resolver for tests, populated with exact answers.
#[derive(Default)]
pub struct FakeResolver {
    srv: Mutex<HashMap<(String, String), Vec<SrvTarget>>>,
    cnames: Mutex<HashMap<String, String>>,
    addresses: Mutex<HashMap<String, IpAddr>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_srv_entry(&self, domain: &str, service: &str, url: &Url) {
        let host = url.host_str().unwrap_or_default().to_string();
        let port = url.port().unwrap_or(0);
        self.srv.lock().unwrap().entry((service.to_string(), domain.to_string())).or_default().push(SrvTarget {
            host: host.clone(),
            port,
            priority: 0,
            weight: 0,
        });
        if let Ok(addr) = host.parse::<IpAddr>() {
            self.addresses.lock().unwrap().insert(host, addr);
        }
    }

    pub fn add_cname_entry(&self, alias: &str, canonical: &str) {
        self.cnames.lock().unwrap().insert(alias.to_string(), canonical.to_string());
    }

    pub fn add_address(&self, host: &str, addr: IpAddr) {
        self.addresses.lock().unwrap().insert(host.to_string(), addr);
    }
}

#[async_trait]
impl DnsResolver for FakeResolver {
    async fn resolve_srv(&self, service: &str, domain: &str) -> Result<Vec<SrvTarget>> {
        self.srv
            .lock()
            .unwrap()
            .get(&(service.to_string(), domain.to_string()))
            .cloned()
            .ok_or_else(|| {
                NsmError::new(
                    ErrorCategory::NotFound,
                    codes::DNS_NO_SRV_RECORD,
                    format!("no fake SRV entry for _{service}._tcp.{domain}"),
                )
            })
    }

    async fn resolve_cname(&self, host: &str) -> Result<Option<String>> {
        Ok(self.cnames.lock().unwrap().get(host).cloned())
    }

    async fn resolve_address(&self, host: &str) -> Result<IpAddr> {
        if let Ok(addr) = host.parse::<IpAddr>() {
            return Ok(addr);
        }
        self.addresses.lock().unwrap().get(host).copied().ok_or_else(|| {
            NsmError::new(
                ErrorCategory::NotFound,
                codes::DNS_RESOLUTION_FAILED,
                format!("no fake address record for {host:?}"),
            )
        })
    }
}
