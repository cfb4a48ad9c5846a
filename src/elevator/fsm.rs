/***************************************/
/*        3rd party libraries          */
/***************************************/
use anyhow::anyhow;
use crossbeam_channel as cbc;
use log::{debug, error, info, warn};
use network_rust::udpnet::peers::PeerUpdate;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::ElevatorConfig;
use crate::coordinator::Coordinator;
use crate::network::OrderMessage;
use crate::orders::scheduler;
use crate::shared::{
    Behaviour, ButtonKind, CallButton, CarState, Direction, HallDirection, TimerHandle, TimerToken,
};

enum Event {
    FloorReached(u8),
    ButtonPressed(CallButton),
    StopButton(bool),
    OrderReceived(OrderMessage),
    PeersChanged(PeerUpdate),
    TimerFired(TimerToken),
    Terminate,
}

/***************************************/
/*             Public API              */
/***************************************/

/**
 * Manages elevator operation logic.
 *
 * The `ElevatorFSM` (Finite State Machine) is the single consumer of every event in the
 * system: floor arrivals, button presses, the stop button, order messages from peers and
 * timer firings. Each event is handled to completion before the next one is taken, so
 * the order store and the car state are only ever touched from this thread.
 *
 * # Fields
 * - `hw_motor_direction_tx`:   Sends motor direction commands (up, down, stop).
 * - `hw_door_light_tx`:        Controls the door open lamp.
 * - `hw_floor_sensor_rx`:      Receives floor arrival events.
 * - `hw_call_button_rx`:       Receives hall and cab button presses.
 * - `hw_stop_button_rx`:       Receives stop button presses and releases.
 * - `net_order_recv_rx`:       Receives order messages from the network.
 * - `net_peer_update_rx`:      Receives peer discovery updates.
 * - `timer`:                   Arms the door dwell timer.
 * - `timer_fired_rx`:          Receives dwell and claim timer firings.
 * - `state_tx`:                Publishes the car state after every event.
 * - `terminate_rx`:            Stops the loop.
 * - `coordinator`:             Owns the order store and talks to peers.
 * - `state`:                   Floor, committed direction and behaviour of the car.
 * - `n_floors`:                Number of floors served.
 * - `door_open_time`:          How long the door stays open at a stop.
 * - `dwell_generation`:        Generation of the live dwell timer.
 * - `stop_pressed`:            Whether the stop button is held.
 */
pub struct ElevatorFSM {
    // Hardware channels
    hw_motor_direction_tx: cbc::Sender<Direction>,
    hw_door_light_tx: cbc::Sender<bool>,
    hw_floor_sensor_rx: cbc::Receiver<u8>,
    hw_call_button_rx: cbc::Receiver<CallButton>,
    hw_stop_button_rx: cbc::Receiver<bool>,

    // Network channels
    net_order_recv_rx: cbc::Receiver<OrderMessage>,
    net_peer_update_rx: cbc::Receiver<PeerUpdate>,

    // Timer channels
    timer: TimerHandle,
    timer_fired_rx: cbc::Receiver<TimerToken>,

    // Observer channels
    state_tx: cbc::Sender<CarState>,
    terminate_rx: cbc::Receiver<()>,

    // Private fields
    coordinator: Coordinator,
    state: CarState,
    n_floors: u8,
    door_open_time: Duration,
    dwell_generation: u64,
    stop_pressed: bool,
}

/// Whether driving in `direction` from `floor` stays inside the shaft.
pub fn is_within_shaft(floor: u8, n_floors: u8, direction: Direction) -> bool {
    match direction {
        Direction::Up => floor + 1 < n_floors,
        Direction::Down => floor > 0,
        Direction::Stop => true,
    }
}

impl ElevatorFSM {
    pub fn new(
        config: &ElevatorConfig,
        initial_floor: u8,
        coordinator: Coordinator,
        hw_motor_direction_tx: cbc::Sender<Direction>,
        hw_door_light_tx: cbc::Sender<bool>,
        hw_floor_sensor_rx: cbc::Receiver<u8>,
        hw_call_button_rx: cbc::Receiver<CallButton>,
        hw_stop_button_rx: cbc::Receiver<bool>,
        net_order_recv_rx: cbc::Receiver<OrderMessage>,
        net_peer_update_rx: cbc::Receiver<PeerUpdate>,
        timer: TimerHandle,
        timer_fired_rx: cbc::Receiver<TimerToken>,
        state_tx: cbc::Sender<CarState>,
        terminate_rx: cbc::Receiver<()>,
    ) -> ElevatorFSM {
        ElevatorFSM {
            hw_motor_direction_tx,
            hw_door_light_tx,
            hw_floor_sensor_rx,
            hw_call_button_rx,
            hw_stop_button_rx,
            net_order_recv_rx,
            net_peer_update_rx,
            timer,
            timer_fired_rx,
            state_tx,
            terminate_rx,
            coordinator,
            state: CarState::new(initial_floor),
            n_floors: config.n_floors,
            door_open_time: config.door_open_time(),
            dwell_generation: 0,
            stop_pressed: false,
        }
    }

    /// Runs until told to terminate. Fails if a producer thread has gone away.
    pub fn run(mut self) -> anyhow::Result<()> {
        info!("Control loop started at floor {}", self.state.floor);
        self.publish_state();

        // Main loop
        loop {
            match self.wait_for_event()? {
                Event::Terminate => {
                    info!("Control loop terminated, stopping the car");
                    let _ = self.hw_motor_direction_tx.send(Direction::Stop);
                    return Ok(());
                }
                event => self.handle_event(event),
            }
            self.publish_state();
        }
    }

    fn wait_for_event(&self) -> anyhow::Result<Event> {
        let event = cbc::select! {
            recv(self.hw_floor_sensor_rx) -> floor => floor.map(Event::FloorReached),
            recv(self.hw_call_button_rx) -> button => button.map(Event::ButtonPressed),
            recv(self.hw_stop_button_rx) -> pressed => pressed.map(Event::StopButton),
            recv(self.net_order_recv_rx) -> message => message.map(Event::OrderReceived),
            recv(self.net_peer_update_rx) -> update => update.map(Event::PeersChanged),
            recv(self.timer_fired_rx) -> token => token.map(Event::TimerFired),
            recv(self.terminate_rx) -> _ => Ok(Event::Terminate),
        };
        event.map_err(|_| anyhow!("An event producer disconnected from the control loop"))
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::FloorReached(floor) => self.floor_reached(floor),

            Event::ButtonPressed(button) => {
                match button.kind {
                    ButtonKind::Cab => self.coordinator.cab_button_pressed(button.floor),
                    ButtonKind::HallUp => self
                        .coordinator
                        .hall_button_pressed(button.floor, HallDirection::Up),
                    ButtonKind::HallDown => self
                        .coordinator
                        .hall_button_pressed(button.floor, HallDirection::Down),
                }
                self.reschedule(true);
            }

            Event::StopButton(pressed) => self.stop_button(pressed),

            Event::OrderReceived(message) => {
                if self.coordinator.handle_message(message) {
                    self.reschedule(false);
                }
            }

            Event::PeersChanged(update) => {
                info!("Peers: {:?}", update.peers);
                if !update.lost.is_empty() {
                    warn!("Lost peers: {:?}", update.lost);
                }
            }

            Event::TimerFired(TimerToken::Dwell { generation }) => {
                let is_live = generation == self.dwell_generation;
                if is_live && self.state.behaviour == Behaviour::DoorOpen {
                    self.close_door();
                } else {
                    debug!("Ignoring stale dwell timer (generation {})", generation);
                }
            }

            Event::TimerFired(TimerToken::Claim {
                floor,
                direction,
                generation,
            }) => {
                if self.coordinator.claim_expired(floor, direction, generation) {
                    self.reschedule(false);
                }
            }

            Event::Terminate => {}
        }
    }

    fn floor_reached(&mut self, floor: u8) {
        self.state.floor = floor;

        if self.state.behaviour != Behaviour::Traveling {
            debug!("Floor {} reported while {:?}", floor, self.state.behaviour);
            return;
        }

        if scheduler::should_stop(self.coordinator.orders(), floor, self.state.direction) {
            self.stop_and_serve();
            return;
        }

        // Nothing to do here; keep going, turn around, or stop if the work is gone
        let next =
            scheduler::next_direction(self.coordinator.orders(), floor, self.state.direction);
        if next == Direction::Stop {
            info!("No more orders, idle at floor {}", floor);
            self.state.direction = Direction::Stop;
            self.state.behaviour = Behaviour::Idle;
            self.send_motor(Direction::Stop);
        } else if next != self.state.direction {
            self.state.direction = next;
            if !self.drive(next) {
                self.state.direction = Direction::Stop;
                self.state.behaviour = Behaviour::Idle;
                self.send_motor(Direction::Stop);
            }
        }
    }

    /// Re-evaluates where to go after the orders changed. A traveling car is only
    /// redirected by button presses, and never stopped between floors.
    fn reschedule(&mut self, redirect_traveling: bool) {
        match self.state.behaviour {
            Behaviour::DoorOpen => {}
            Behaviour::Idle => self.depart(),
            Behaviour::Traveling => {
                if !redirect_traveling {
                    return;
                }
                let next = scheduler::next_direction(
                    self.coordinator.orders(),
                    self.state.floor,
                    self.state.direction,
                );
                if next != Direction::Stop && next != self.state.direction {
                    info!("Redirecting {:?} -> {:?}", self.state.direction, next);
                    self.state.direction = next;
                    self.drive(next);
                }
            }
        }
    }

    /// Picks a direction for a car standing at a floor with the door closed.
    fn depart(&mut self) {
        let floor = self.state.floor;
        let next =
            scheduler::next_direction(self.coordinator.orders(), floor, self.state.direction);

        if next == Direction::Stop {
            self.state.direction = Direction::Stop;
            self.state.behaviour = Behaviour::Idle;
            if self.coordinator.orders().is_pending_at(floor) {
                self.stop_and_serve();
            }
            return;
        }

        if self.drive(next) {
            self.state.direction = next;
            self.state.behaviour = Behaviour::Traveling;
        } else {
            self.state.direction = Direction::Stop;
            self.state.behaviour = Behaviour::Idle;
        }
    }

    fn stop_and_serve(&mut self) {
        let floor = self.state.floor;
        let served =
            scheduler::served_direction(self.coordinator.orders(), floor, self.state.direction);

        self.send_motor(Direction::Stop);
        self.coordinator.order_served(floor, served);
        self.state.direction = served;
        info!("Stopped at floor {} serving {:?}", floor, served);

        self.open_door();
    }

    fn open_door(&mut self) {
        self.state.behaviour = Behaviour::DoorOpen;
        self.state.door_open = true;
        let _ = self.hw_door_light_tx.send(true);

        self.dwell_generation += 1;
        self.timer.schedule(
            TimerToken::Dwell {
                generation: self.dwell_generation,
            },
            self.door_open_time,
        );
    }

    fn close_door(&mut self) {
        self.state.door_open = false;
        let _ = self.hw_door_light_tx.send(false);
        self.depart();
    }

    fn stop_button(&mut self, pressed: bool) {
        self.stop_pressed = pressed;
        if pressed {
            warn!("Stop button pressed, halting");
            let _ = self.hw_motor_direction_tx.send(Direction::Stop);
            return;
        }

        info!("Stop button released");
        match self.state.behaviour {
            Behaviour::Traveling => {
                self.drive(self.state.direction);
            }
            Behaviour::Idle => self.depart(),
            Behaviour::DoorOpen => {}
        }
    }

    /// Issues a travel command. Returns false if it would leave the shaft.
    fn drive(&mut self, direction: Direction) -> bool {
        if !is_within_shaft(self.state.floor, self.n_floors, direction) {
            error!(
                "Refusing to drive {:?} from floor {}, outside the shaft",
                direction, self.state.floor
            );
            return false;
        }
        self.send_motor(direction);
        true
    }

    fn send_motor(&self, direction: Direction) {
        if self.stop_pressed {
            debug!("Stop button held, suppressing motor {:?}", direction);
            return;
        }
        let _ = self.hw_motor_direction_tx.send(direction);
    }

    fn publish_state(&self) {
        let _ = self.state_tx.send(self.state);
    }
}
