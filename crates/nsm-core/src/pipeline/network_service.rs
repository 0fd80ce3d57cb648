//! The Request/Close chain (`spec.md` §4.A), composing handlers that each
//! see the whole [`Connection`] on the way down and on the way back up.

use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::Connection;
use crate::contract::CallContext;
use crate::error::Result;

/// A single link in a `NetworkServiceChain`. Implementors may call `next`
/// and transform the result, return early without calling it, or call it
/// and act on the way back (`spec.md` §4.A).
#[async_trait]
pub trait NetworkServiceHandler: Send + Sync {
    async fn request(
        &self,
        conn: Connection,
        ctx: &mut CallContext,
        next: Next<'_>,
    ) -> Result<Connection>;

    /// Close uses a context supplied at chain-construction time that
    /// outlives any individual Request's context, so eviction can proceed
    /// after the client disconnects (`spec.md` §5).
    async fn close(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<()>;
}

/// The "next" reference handed to a handler: invoking it runs the
/// remainder of the chain starting at the following index. Calling it on
/// the last handler's `next` is a no-op that returns the connection/unit
/// unchanged — there is no requirement that a chain terminate in a
/// sentinel handler.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [Arc<dyn NetworkServiceHandler>],
    index: usize,
}

impl<'a> Next<'a> {
    fn new(handlers: &'a [Arc<dyn NetworkServiceHandler>]) -> Self {
        Self { handlers, index: 0 }
    }

    pub async fn request(self, conn: Connection, ctx: &mut CallContext) -> Result<Connection> {
        match self.handlers.get(self.index) {
            Some(handler) => {
                let advanced = Next {
                    handlers: self.handlers,
                    index: self.index + 1,
                };
                handler.request(conn, ctx, advanced).await
            }
            None => Ok(conn),
        }
    }

    pub async fn close(self, conn: Connection, ctx: &mut CallContext) -> Result<()> {
        match self.handlers.get(self.index) {
            Some(handler) => {
                let advanced = Next {
                    handlers: self.handlers,
                    index: self.index + 1,
                };
                handler.close(conn, ctx, advanced).await
            }
            None => Ok(()),
        }
    }
}

/// A named, composed sequence of [`NetworkServiceHandler`]s presented to
/// outer callers as a single handler.
pub struct NetworkServiceChain {
    name: Arc<str>,
    handlers: Arc<[Arc<dyn NetworkServiceHandler>]>,
}

impl NetworkServiceChain {
    pub fn new(name: impl Into<Arc<str>>, handlers: Vec<Arc<dyn NetworkServiceHandler>>) -> Self {
        Self {
            name: name.into(),
            handlers: handlers.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fingerprint(&self) -> u64 {
        super::fingerprint_handlers(&self.handlers)
    }

    #[tracing::instrument(skip_all, fields(chain = %self.name))]
    pub async fn request(&self, conn: Connection, ctx: &mut CallContext) -> Result<Connection> {
        Next::new(&self.handlers).request(conn, ctx).await
    }

    #[tracing::instrument(skip_all, fields(chain = %self.name))]
    pub async fn close(&self, conn: Connection, ctx: &mut CallContext) -> Result<()> {
        Next::new(&self.handlers).close(conn, ctx).await
    }
}
