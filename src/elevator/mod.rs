pub mod fsm;
pub mod hardware;
pub mod hardware_tests;

pub use fsm::ElevatorFSM;
pub use hardware::{calibrate, ElevatorDriver};
