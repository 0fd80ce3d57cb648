//! Assigns this hop's path segment (`spec.md` §4.C), combining what the
//! original source splits across `pkg/networkservice/common/updatepath` and
//! `pkg/networkservice/common/updatetoken` — in this model token and expiry
//! live on the same [`PathSegment`](crate::connection::PathSegment) that
//! [`Path::advance`](crate::connection::Path::advance) writes, so assigning
//! a fresh token *is* advancing the path; there's no second pass to make.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::connection::Connection;
use crate::contract::CallContext;
use crate::error::Result;
use crate::pipeline::network_service::{NetworkServiceHandler, Next};

pub struct UpdatePathHandler {
    name: String,
    index: usize,
    token_ttl: Duration,
}

impl UpdatePathHandler {
    pub fn new(name: impl Into<String>, index: usize, token_ttl: Duration) -> Self {
        Self { name: name.into(), index, token_ttl }
    }
}

#[async_trait]
impl NetworkServiceHandler for UpdatePathHandler {
    async fn request(&self, mut conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<Connection> {
        let token = ctx
            .token_generator
            .as_ref()
            .map(|g| g.generate(&self.name))
            .unwrap_or_default();
        conn.path.advance(self.index, &self.name, token, SystemTime::now() + self.token_ttl)?;
        next.request(conn, ctx).await
    }

    async fn close(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<()> {
        next.close(conn, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{StaticTokenGenerator, TokenGenerator};
    use std::sync::Arc;

    #[tokio::test]
    async fn assigns_token_and_expiry_at_configured_index() {
        let handler = UpdatePathHandler::new("nsmgr-1", 0, Duration::from_secs(60));
        let mut ctx = CallContext::new();
        ctx.token_generator = Some(Arc::new(StaticTokenGenerator("tok-123".into())) as Arc<dyn TokenGenerator>);
        let handlers: Vec<Arc<dyn NetworkServiceHandler>> = vec![Arc::new(handler)];
        let chain = crate::pipeline::network_service::NetworkServiceChain::new("chain", handlers);

        let conn = chain.request(Connection::new("svc"), &mut ctx).await.unwrap();
        let segment = conn.path.current().unwrap();
        assert_eq!(segment.name, "nsmgr-1");
        assert_eq!(segment.token, "tok-123");
    }

    #[tokio::test]
    async fn refresh_at_same_index_keeps_segment_id() {
        let mut ctx = CallContext::new();
        let handlers: Vec<Arc<dyn NetworkServiceHandler>> =
            vec![Arc::new(UpdatePathHandler::new("nsmgr-1", 0, Duration::from_secs(60)))];
        let chain = crate::pipeline::network_service::NetworkServiceChain::new("chain", handlers);

        let conn = chain.request(Connection::new("svc"), &mut ctx).await.unwrap();
        let id = conn.path.current().unwrap().id;
        let conn = chain.request(conn, &mut ctx).await.unwrap();
        assert_eq!(conn.path.current().unwrap().id, id);
    }
}
