/***************************************/
/*        3rd party libraries          */
/***************************************/
use driver_rust::elevio::elev::{CAB, DIRN_DOWN, DIRN_STOP, DIRN_UP, HALL_DOWN, HALL_UP};
use serde::Deserialize;
use serde::Serialize;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Idle,
    Traveling,
    DoorOpen,
}

/// Direction of travel. `Stop` means stationary or no pending work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Stop,
}

/// The only directions a hall call can carry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HallDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    HallUp,
    HallDown,
    Cab,
}

/// A button press on a panel, as seen by the hardware poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallButton {
    pub floor: u8,
    pub kind: ButtonKind,
}

/// A lamp command for one call button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLight {
    pub floor: u8,
    pub kind: ButtonKind,
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarState {
    pub behaviour: Behaviour,
    pub floor: u8,
    pub direction: Direction,
    pub door_open: bool,
}

/***************************************/
/*           Implementations           */
/***************************************/
impl Direction {
    pub fn to_u8(&self) -> u8 {
        match *self {
            Direction::Up => DIRN_UP,
            Direction::Down => DIRN_DOWN,
            Direction::Stop => DIRN_STOP,
        }
    }

    pub fn as_hall(&self) -> Option<HallDirection> {
        match *self {
            Direction::Up => Some(HallDirection::Up),
            Direction::Down => Some(HallDirection::Down),
            Direction::Stop => None,
        }
    }
}

impl HallDirection {
    pub fn index(&self) -> usize {
        match *self {
            HallDirection::Up => 0,
            HallDirection::Down => 1,
        }
    }

    pub fn opposite(&self) -> HallDirection {
        match *self {
            HallDirection::Up => HallDirection::Down,
            HallDirection::Down => HallDirection::Up,
        }
    }
}

impl ButtonKind {
    pub fn to_u8(&self) -> u8 {
        match *self {
            ButtonKind::HallUp => HALL_UP,
            ButtonKind::HallDown => HALL_DOWN,
            ButtonKind::Cab => CAB,
        }
    }

    pub fn hall(direction: HallDirection) -> ButtonKind {
        match direction {
            HallDirection::Up => ButtonKind::HallUp,
            HallDirection::Down => ButtonKind::HallDown,
        }
    }
}

impl CarState {
    pub fn new(floor: u8) -> CarState {
        CarState {
            behaviour: Behaviour::Idle,
            floor,
            direction: Direction::Stop,
            door_open: false,
        }
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
