pub mod macros;
pub mod structs;
pub mod timer;

pub use structs::Behaviour;
pub use structs::ButtonKind;
pub use structs::ButtonLight;
pub use structs::CallButton;
pub use structs::CarState;
pub use structs::Direction;
pub use structs::HallDirection;
pub use timer::{Timer, TimerHandle, TimerToken};
