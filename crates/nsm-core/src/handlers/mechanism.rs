//! Appends a fixed mechanism preference on every Request, idempotently
//! (`spec.md` §8, S6), grounded on
//! `pkg/networkservice/common/mechanisms/kernel`.

use async_trait::async_trait;

use crate::connection::{Connection, Mechanism};
use crate::contract::CallContext;
use crate::error::Result;
use crate::pipeline::network_service::{NetworkServiceHandler, Next};

pub struct MechanismPreferenceHandler {
    mechanism: Mechanism,
}

impl MechanismPreferenceHandler {
    pub fn new(mechanism: Mechanism) -> Self {
        Self { mechanism }
    }
}

#[async_trait]
impl NetworkServiceHandler for MechanismPreferenceHandler {
    async fn request(&self, mut conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<Connection> {
        conn.add_mechanism_preference(self.mechanism.clone());
        next.request(conn, ctx).await
    }

    async fn close(&self, conn: Connection, ctx: &mut CallContext, next: Next<'_>) -> Result<()> {
        next.close(conn, ctx).await
    }
}
