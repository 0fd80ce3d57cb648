//! Serializes Request/Close for the same connection id through
//! [`Serializer`](crate::serializer::Serializer), placed immediately after
//! authorization per `spec.md` §4.B.
//!
//! This wraps a downstream [`NetworkServiceChain`] directly rather than
//! implementing [`NetworkServiceHandler`] and taking a borrowed
//! [`Next`](crate::pipeline::network_service::Next): the continuation has to
//! be queued onto the id's worker task as an owned, `'static` future, which
//! a `Next<'_>` borrowed from the chain's handler slice can't cross. The
//! same shape is used by [`RefreshController`](crate::governance::RefreshController)
//! and [`TimeoutController`](crate::governance::TimeoutController) for the
//! same reason.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::connection::Connection;
use crate::contract::CallContext;
use crate::error::{NsmError, Result};
use crate::pipeline::network_service::NetworkServiceChain;
use crate::serializer::Serializer;

pub struct SerializingChain {
    downstream: Arc<NetworkServiceChain>,
    serializer: Arc<Serializer>,
}

impl SerializingChain {
    pub fn new(downstream: Arc<NetworkServiceChain>) -> Self {
        Self {
            downstream,
            serializer: Arc::new(Serializer::new()),
        }
    }

    pub async fn request(&self, conn: Connection, ctx: &mut CallContext) -> Result<Connection> {
        let id = conn
            .id()
            .ok_or_else(|| NsmError::internal("serializing chain requires an already-assigned connection id"))?;

        let (tx, rx) = oneshot::channel();
        let downstream = self.downstream.clone();
        let mut owned_ctx = ctx.child();
        let cancellation = ctx.cancellation.clone();

        self.serializer.submit(id, cancellation, move |_cancellation| async move {
            let result = downstream.request(conn, &mut owned_ctx).await;
            let _ = tx.send((result, owned_ctx));
        });

        let (result, returned_ctx) = rx
            .await
            .map_err(|_| NsmError::internal("serializing chain worker dropped without responding"))?;
        *ctx = returned_ctx;
        result
    }

    pub async fn close(&self, conn: Connection, ctx: &mut CallContext) -> Result<()> {
        let id = conn
            .id()
            .ok_or_else(|| NsmError::internal("serializing chain requires an already-assigned connection id"))?;

        let (tx, rx) = oneshot::channel();
        let downstream = self.downstream.clone();
        let mut owned_ctx = ctx.child();
        let cancellation = ctx.cancellation.clone();

        self.serializer.submit(id, cancellation, move |_cancellation| async move {
            let result = downstream.close(conn, &mut owned_ctx).await;
            let _ = tx.send((result, owned_ctx));
        });

        let (result, returned_ctx) = rx
            .await
            .map_err(|_| NsmError::internal("serializing chain worker dropped without responding"))?;
        *ctx = returned_ctx;
        result
    }
}
