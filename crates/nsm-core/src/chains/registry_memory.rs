//! The in-memory registry server chain (`spec.md` §4.E): just the store
//! itself, since nothing precedes it on the server side in this workspace's
//! scope.

use std::sync::Arc;

use crate::pipeline::registry::RegistryChain;
use crate::registry::{RegistryEntry, Store, StoreHandler};
use crate::registry::query::Matches;

pub fn build<E>() -> RegistryChain<E>
where
    E: RegistryEntry + Matches,
{
    let store = Arc::new(Store::<E>::new());
    RegistryChain::new("memory", vec![Arc::new(StoreHandler::new(store))])
}
