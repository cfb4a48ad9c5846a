pub mod message;
pub mod network;

pub use message::{MessageKind, OrderMessage};
pub use network::Network;
