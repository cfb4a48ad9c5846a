pub mod scheduler;
pub mod store;

pub use store::{ClaimState, OrderStore};
