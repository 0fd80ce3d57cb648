//! Arms the server-side eviction timer after every successful Request and
//! disarms it on Close (`spec.md` §4.D), wrapping
//! [`TimeoutController`](crate::governance::TimeoutController) as an
//! ordinary chain link.

use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::Connection;
use crate::contract::CallContext;
use crate::error::Result;
use crate::governance::TimeoutController;
use crate::pipeline::network_service::{NetworkServiceHandler, Next};

pub struct TimeoutHandler {
    controller: Arc<TimeoutController>,
}

impl TimeoutHandler {
    pub fn new(controller: Arc<TimeoutController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl NetworkServiceHandler for TimeoutHandler {
    async fn request(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<Connection> {
        let conn = next.request(conn, ctx).await?;
        self.controller.arm(&conn);
        Ok(conn)
    }

    async fn close(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<()> {
        if let Some(id) = conn.id() {
            self.controller.disarm(id);
        }
        next.close(conn, ctx).await
    }
}
