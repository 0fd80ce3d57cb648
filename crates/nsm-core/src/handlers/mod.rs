//! Concrete [`NetworkServiceHandler`](crate::pipeline::network_service::NetworkServiceHandler)
//! implementations composed into the chains in [`crate::chains`].

pub mod mechanism;
pub mod metadata;
pub mod serialize_handler;
pub mod timeout_handler;
pub mod tokencheck;
pub mod updatepath;

pub use mechanism::MechanismPreferenceHandler;
pub use metadata::{MetadataClearHandler, MetadataStore};
pub use serialize_handler::SerializingChain;
pub use timeout_handler::TimeoutHandler;
pub use tokencheck::TokenCheckHandler;
pub use updatepath::UpdatePathHandler;
