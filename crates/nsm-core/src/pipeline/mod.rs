//! Chain-of-responsibility middleware runtime (`spec.md` §4.A).
//!
//! A chain is an array of handler trait objects plus a per-call cursor; the
//! "next" reference handed to a handler is just "invoke the next index" —
//! no runtime type assertions, no reflective interface composition (Design
//! Notes §9). Two independently-typed chain families share this shape:
//! [`network_service`] (Request/Close) and [`registry`] (Register/Find/
//! Unregister), the latter generic over the entry type so the identical
//! NetworkService and NetworkServiceEndpoint registry chains are one
//! implementation, not two code-generated copies.

pub mod network_service;
pub mod registry;

use std::hash::{Hash, Hasher};

/// Identity fingerprint of a chain, derived from the addresses of its
/// handler trait objects — stable for the life of the chain, useful for
/// tracing without requiring handlers to self-name.
pub fn fingerprint_handlers<T>(handlers: &[std::sync::Arc<T>]) -> u64
where
    T: ?Sized,
{
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for handler in handlers {
        let ptr = std::sync::Arc::as_ptr(handler) as *const () as usize;
        ptr.hash(&mut hasher);
    }
    hasher.finish()
}
