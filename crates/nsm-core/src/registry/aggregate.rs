//! Fans a single Register/Find/Unregister call out across several
//! downstream registry chains and merges their results.
//!
//! Recovered from `pkg/registry/core/aggregate` (SPEC_FULL.md §10 item 1):
//! the distilled spec only describes one registry per domain, but a real
//! NSMgr typically chains a local in-memory registry alongside a floating
//! registry and/or a peer proxy, and needs their Find streams merged.

use std::sync::Arc;

use crate::contract::CallContext;
use crate::error::Result;
use crate::pipeline::registry::{FindSink, Query, RegistryChain};

pub struct AggregateRegistry<E> {
    members: Vec<Arc<RegistryChain<E>>>,
}

impl<E: Clone + Send + Sync + 'static> AggregateRegistry<E> {
    pub fn new(members: Vec<Arc<RegistryChain<E>>>) -> Self {
        Self { members }
    }

    /// Registers with every member in order; the first error short-circuits
    /// the rest, matching ordinary chain error propagation. Returns the
    /// last member's response (mirrors "each hop may amend the entry").
    pub async fn register(&self, mut entry: E, ctx: &mut CallContext) -> Result<E> {
        for member in &self.members {
            entry = member.register(entry, ctx).await?;
        }
        Ok(entry)
    }

    /// Queries every member and delivers the union of matching entries to
    /// `sink`, snapshot and watch events alike; a slow or failing member
    /// does not block delivery from the others.
    pub async fn find(&self, query: Query<E>, ctx: &mut CallContext, sink: Arc<dyn FindSink<E>>) -> Result<()> {
        for member in &self.members {
            member.find(query.clone(), ctx, sink.clone()).await?;
        }
        Ok(())
    }

    pub async fn unregister(&self, entry: E, ctx: &mut CallContext) -> Result<()> {
        for member in &self.members {
            member.unregister(entry.clone(), ctx).await?;
        }
        Ok(())
    }
}
