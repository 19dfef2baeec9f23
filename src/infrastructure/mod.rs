pub mod inflight;
pub mod store;

pub use inflight::{InFlightGuard, InFlightRegistry};
pub use store::{BatchRepository, MemoryStore};
