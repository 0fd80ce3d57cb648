//! Rejects a Request or Close whose path carries any expired segment
//! (`spec.md` §7: `TokenExpired` maps to `PermissionDenied`), grounded on
//! `pkg/networkservice/common/authorize`'s expiry check ahead of the
//! policy-engine piece that crate leaves out of scope.

use std::time::SystemTime;

use async_trait::async_trait;

use crate::connection::Connection;
use crate::contract::CallContext;
use crate::error::{NsmError, Result};
use crate::pipeline::network_service::{NetworkServiceHandler, Next};

pub struct TokenCheckHandler;

#[async_trait]
impl NetworkServiceHandler for TokenCheckHandler {
    async fn request(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<Connection> {
        if let Some(expired) = conn.path.first_expired_segment(SystemTime::now()) {
            return Err(NsmError::token_expired(&expired.name));
        }
        next.request(conn, ctx).await
    }

    async fn close(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<()> {
        if let Some(expired) = conn.path.first_expired_segment(SystemTime::now()) {
            return Err(NsmError::token_expired(&expired.name));
        }
        next.close(conn, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn expired_segment_is_rejected_as_permission_denied() {
        let mut conn = Connection::new("svc");
        conn.path
            .advance(0, "nsmgr-1", "tok".into(), SystemTime::now() - Duration::from_secs(1))
            .unwrap();

        let handlers: Vec<Arc<dyn NetworkServiceHandler>> = vec![Arc::new(TokenCheckHandler)];
        let chain = crate::pipeline::network_service::NetworkServiceChain::new("chain", handlers);
        let mut ctx = CallContext::new();
        let err = chain.request(conn, &mut ctx).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::PermissionDenied);
    }

    #[tokio::test]
    async fn fresh_segment_passes_through() {
        let mut conn = Connection::new("svc");
        conn.path
            .advance(0, "nsmgr-1", "tok".into(), SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        let handlers: Vec<Arc<dyn NetworkServiceHandler>> = vec![Arc::new(TokenCheckHandler)];
        let chain = crate::pipeline::network_service::NetworkServiceChain::new("chain", handlers);
        let mut ctx = CallContext::new();
        assert!(chain.request(conn, &mut ctx).await.is_ok());
    }
}
