//! Values threaded through every chain call: cancellation, deadlines, and
//! the handful of well-known fields `spec.md` §6 calls "context-carried
//! values" (`clientURL`, logger, cancellation, authInfo, tokenGenerator).
//!
//! Grounded on the teacher's `Cancellation`/`Deadline` primitives, with a
//! concrete `CallContext` struct replacing the dynamic key/value context the
//! original Go SDK threads through `context.Context` — Design Notes §9 calls
//! this out explicitly: "pass a small struct of well-known fields... and
//! reserve a typed extension map for user handlers."

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::Instant as TokioInstant;
use url::Url;

/// Cooperative cancellation signal, shareable across tasks and cloneable
/// children. A child observes its parent's cancellation but can also be
/// cancelled independently without affecting the parent.
#[derive(Clone)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<Cancellation>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: None,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// A child cancellation: cancelling the child does not cancel the
    /// parent, but cancelling the parent is observed by the child.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::new(self.clone())),
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// An optional absolute point in time past which an operation must be
/// abandoned. `None` means "no deadline".
#[derive(Clone, Copy, Debug)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(duration: Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn as_tokio_instant(&self) -> Option<TokioInstant> {
        self.0.map(TokioInstant::from_std)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

/// Peer identity surfaced by the (out-of-scope) authentication layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthInfo {
    pub subject: String,
}

/// Out-of-scope collaborator: produces a fresh per-hop token. The signer
/// itself is external; this crate only calls through the seam.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self, segment_name: &str) -> String;
}

/// A `TokenGenerator` that always returns the same opaque placeholder,
/// useful for tests and for deployments that inject tokens out of band.
pub struct StaticTokenGenerator(pub String);

impl TokenGenerator for StaticTokenGenerator {
    fn generate(&self, _segment_name: &str) -> String {
        self.0.clone()
    }
}

/// The well-known fields every handler may read or set, plus a typed
/// extension map for anything handler-specific that doesn't deserve a
/// first-class field.
#[derive(Clone)]
pub struct CallContext {
    pub client_url: Option<Url>,
    pub cancellation: Cancellation,
    pub deadline: Deadline,
    pub auth_info: Option<AuthInfo>,
    pub token_generator: Option<Arc<dyn TokenGenerator>>,
    extensions: HashMap<&'static str, Arc<dyn std::any::Any + Send + Sync>>,
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            client_url: None,
            cancellation: Cancellation::new(),
            deadline: Deadline::none(),
            auth_info: None,
            token_generator: None,
            extensions: HashMap::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn set_extension<T: Send + Sync + 'static>(&mut self, key: &'static str, value: T) {
        self.extensions.insert(key, Arc::new(value));
    }

    pub fn extension<T: Send + Sync + 'static>(&self, key: &'static str) -> Option<Arc<T>> {
        self.extensions
            .get(key)
            .and_then(|v| v.clone().downcast::<T>().ok())
    }

    /// A child context for a nested call: shares cancellation lineage, keeps
    /// its own deadline and extensions.
    pub fn child(&self) -> Self {
        Self {
            client_url: self.client_url.clone(),
            cancellation: self.cancellation.child(),
            deadline: self.deadline,
            auth_info: self.auth_info.clone(),
            token_generator: self.token_generator.clone(),
            extensions: self.extensions.clone(),
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}
