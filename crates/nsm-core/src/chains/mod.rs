//! Concrete chain assemblies wiring [`crate::handlers`],
//! [`crate::governance`], [`crate::registry`], and [`crate::interdomain`]
//! pieces into the Request/Close and Register/Find/Unregister chains
//! `spec.md` §4 describes as compositions, not as one monolithic type.

pub mod client;
pub mod endpoint;
pub mod nsmgr;
pub mod nsmgrproxy;
pub mod registry_client;
pub mod registry_dnsresolve;
pub mod registry_interdomain;
pub mod registry_memory;
