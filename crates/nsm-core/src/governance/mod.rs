//! Timeout and refresh controllers (`spec.md` §4.D).

pub mod refresh;
pub mod timeout;

pub use refresh::RefreshController;
pub use timeout::TimeoutController;
