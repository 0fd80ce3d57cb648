//! Control-plane core of a network service mesh.
//!
//! A [`Connection`](connection::Connection) is routed, hop by hop, through a
//! [`NetworkServiceChain`](pipeline::network_service::NetworkServiceChain) —
//! the same chain-of-responsibility shape backs registration lifecycle via
//! [`RegistryChain`](pipeline::registry::RegistryChain). [`chains`] wires the
//! individual handlers in [`handlers`], [`governance`], [`registry`], and
//! [`interdomain`] into the concrete client/endpoint/NSMgr/NSMgr-proxy
//! assemblies; nothing in this crate drives a real network transport — that
//! seam is left to callers, the same way it's left to the gRPC layer in the
//! system this crate's architecture is grounded on.

pub mod chains;
pub mod connection;
pub mod contract;
pub mod error;
pub mod governance;
pub mod handlers;
pub mod interdomain;
pub mod pipeline;
pub mod registry;
pub mod serializer;

pub use connection::{Connection, Mechanism, Path, PathSegment, SegmentId};
pub use contract::{AuthInfo, CallContext, Cancellation, Deadline, TokenGenerator};
pub use error::{ErrorCategory, NsmError, Result};
pub use serializer::Serializer;
