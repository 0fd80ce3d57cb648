//! Client-side registration chain: keeps a registration alive with
//! [`RefreshController`] (`spec.md` §4.D, REDESIGN FLAG #2) in front of
//! whatever transport chain reaches the registry server.

use std::sync::Arc;

use crate::governance::RefreshController;
use crate::pipeline::registry::RegistryChain;
use crate::registry::RegistryEntry;

pub fn build<E: RegistryEntry>(downstream: Arc<RegistryChain<E>>) -> RefreshController<E> {
    RefreshController::new(downstream)
}
