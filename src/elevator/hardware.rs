use crate::shared::{ButtonKind, ButtonLight, CallButton, Direction};
use anyhow::bail;
use crossbeam_channel as cbc;
use driver_rust::elevio::elev::Elevator;
use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};

const BUTTON_KINDS: [ButtonKind; 3] = [ButtonKind::HallUp, ButtonKind::HallDown, ButtonKind::Cab];

/// Point reads and writes of the physical elevator. None of them block.
pub trait ElevatorIo {
    fn num_floors(&self) -> u8;
    fn read_floor(&self) -> Option<u8>;
    fn read_button(&self, floor: u8, kind: ButtonKind) -> bool;
    fn read_stop(&self) -> bool;
    fn set_motor(&self, direction: Direction);
    fn set_door_lamp(&self, on: bool);
    fn set_button_lamp(&self, floor: u8, kind: ButtonKind, on: bool);
    fn set_floor_indicator(&self, floor: u8);
    fn set_stop_lamp(&self, on: bool);
}

impl ElevatorIo for Elevator {
    fn num_floors(&self) -> u8 {
        self.num_floors
    }

    fn read_floor(&self) -> Option<u8> {
        self.floor_sensor()
    }

    fn read_button(&self, floor: u8, kind: ButtonKind) -> bool {
        self.call_button(floor, kind.to_u8())
    }

    fn read_stop(&self) -> bool {
        self.stop_button()
    }

    fn set_motor(&self, direction: Direction) {
        self.motor_direction(direction.to_u8());
    }

    fn set_door_lamp(&self, on: bool) {
        self.door_light(on);
    }

    fn set_button_lamp(&self, floor: u8, kind: ButtonKind, on: bool) {
        self.call_button_light(floor, kind.to_u8(), on);
    }

    fn set_floor_indicator(&self, floor: u8) {
        self.floor_indicator(floor);
    }

    fn set_stop_lamp(&self, on: bool) {
        self.stop_button_light(on);
    }
}

/**
 * # Elevator Driver
 * Interfaces with the physical elevator hardware.
 *
 * Polls the level signals of the elevator and turns them into edge events for the
 * control loop: one floor event per arrival at a floor, one call button event per
 * press, one stop button event per press and release. Commands from the control loop
 * are applied between polls.
 *
 * The driver stops when the control loop drops its command channels or its event
 * receivers.
 *
 * # Fields
 *
 * - `io`:                      Low-level hardware access.
 * - `poll_period`:             Time between polls when no command arrives.
 * - `current_floor`:           Floor the sensor reported on the last poll, if any.
 * - `stop_pressed`:            Last seen state of the stop button.
 * - `buttons`:                 Last seen state of every call button.
 * - `hw_motor_direction_rx`:   Receiver for motor direction commands.
 * - `hw_button_light_rx`:      Receiver for button light control commands.
 * - `hw_door_light_rx`:        Receiver for door light control commands.
 * - `hw_floor_sensor_tx`:      Sender for floor arrival events.
 * - `hw_call_button_tx`:       Sender for call button presses.
 * - `hw_stop_button_tx`:       Sender for stop button edges.
 */
pub struct ElevatorDriver<T: ElevatorIo> {
    io: T,
    poll_period: Duration,
    current_floor: Option<u8>,
    stop_pressed: bool,
    buttons: Vec<[bool; 3]>,
    hw_motor_direction_rx: cbc::Receiver<Direction>,
    hw_button_light_rx: cbc::Receiver<ButtonLight>,
    hw_door_light_rx: cbc::Receiver<bool>,
    hw_floor_sensor_tx: cbc::Sender<u8>,
    hw_call_button_tx: cbc::Sender<CallButton>,
    hw_stop_button_tx: cbc::Sender<bool>,
}

impl<T: ElevatorIo> ElevatorDriver<T> {
    pub fn new(
        io: T,
        poll_period: Duration,
        hw_motor_direction_rx: cbc::Receiver<Direction>,
        hw_button_light_rx: cbc::Receiver<ButtonLight>,
        hw_door_light_rx: cbc::Receiver<bool>,
        hw_floor_sensor_tx: cbc::Sender<u8>,
        hw_call_button_tx: cbc::Sender<CallButton>,
        hw_stop_button_tx: cbc::Sender<bool>,
    ) -> ElevatorDriver<T> {
        let current_floor = io.read_floor();
        let buttons = vec![[false; 3]; io.num_floors() as usize];
        ElevatorDriver {
            io,
            poll_period,
            current_floor,
            stop_pressed: false,
            buttons,
            hw_motor_direction_rx,
            hw_button_light_rx,
            hw_door_light_rx,
            hw_floor_sensor_tx,
            hw_call_button_tx,
            hw_stop_button_tx,
        }
    }

    /// Polls and applies commands until the control loop goes away. The motor is
    /// stopped on the way out.
    pub fn run(mut self) {
        loop {
            if self.poll_inputs().is_err() {
                debug!("Control loop is gone, hardware driver exiting");
                break;
            }

            // Handle incoming commands
            let running = cbc::select! {
                recv(self.hw_motor_direction_rx) -> msg => match msg {
                    Ok(direction) => { self.io.set_motor(direction); true }
                    Err(_) => false,
                },
                recv(self.hw_button_light_rx) -> msg => match msg {
                    Ok(light) => {
                        self.io.set_button_lamp(light.floor, light.kind, light.on);
                        true
                    }
                    Err(_) => false,
                },
                recv(self.hw_door_light_rx) -> msg => match msg {
                    Ok(on) => { self.io.set_door_lamp(on); true }
                    Err(_) => false,
                },
                default(self.poll_period) => true,
            };

            if !running {
                debug!("Command channels closed, hardware driver exiting");
                break;
            }
        }

        self.io.set_motor(Direction::Stop);
    }

    fn poll_inputs(&mut self) -> Result<(), ()> {
        // Arrival edge at a floor; leaving and coming back to the same floor counts
        let floor = self.io.read_floor();
        if floor != self.current_floor {
            self.current_floor = floor;
            if let Some(floor) = floor {
                self.io.set_floor_indicator(floor);
                info!("Now at floor {}", floor);
                self.hw_floor_sensor_tx.send(floor).map_err(|_| ())?;
            }
        }

        // Stop button, both edges
        let stop_pressed = self.io.read_stop();
        if stop_pressed != self.stop_pressed {
            self.stop_pressed = stop_pressed;
            self.io.set_stop_lamp(stop_pressed);
            self.hw_stop_button_tx.send(stop_pressed).map_err(|_| ())?;
        }

        // Call buttons, press edges only
        for floor in 0..self.io.num_floors() {
            for kind in BUTTON_KINDS {
                let pressed = self.io.read_button(floor, kind);
                let last = &mut self.buttons[floor as usize][kind.to_u8() as usize];
                if pressed != *last {
                    *last = pressed;
                    if pressed {
                        debug!("Button {:?} at floor {} pressed", kind, floor);
                        self.hw_call_button_tx
                            .send(CallButton { floor, kind })
                            .map_err(|_| ())?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Brings the car to a known floor before the control loop starts. Blocking.
///
/// If the sensor reads no floor the car is driven down until one shows up. Fails if
/// none does within `timeout`, which means the hardware is not moving the car.
pub fn calibrate<T: ElevatorIo>(
    io: &T,
    poll_period: Duration,
    timeout: Duration,
) -> anyhow::Result<u8> {
    if let Some(floor) = io.read_floor() {
        io.set_floor_indicator(floor);
        info!("At floor {}, ready for service", floor);
        return Ok(floor);
    }

    warn!("Unknown floor, moving down until a floor is found");
    io.set_motor(Direction::Down);
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(floor) = io.read_floor() {
            io.set_motor(Direction::Stop);
            io.set_floor_indicator(floor);
            info!("At floor {}, ready for service", floor);
            return Ok(floor);
        }

        if Instant::now() >= deadline {
            io.set_motor(Direction::Stop);
            bail!("No floor reached within {:?} while calibrating", timeout);
        }

        thread::sleep(poll_period);
    }
}
