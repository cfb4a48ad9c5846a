/* 3rd party libraries */
use anyhow::{anyhow, Context};
use clap::Parser;
use crossbeam_channel as cbc;
use driver_rust::elevio::elev::Elevator;
use log::{debug, info};
use network_rust::udpnet;
use std::path::PathBuf;
use std::thread::Builder;

/* Custom libraries */
use coordinator::Coordinator;
use elevator::{ElevatorDriver, ElevatorFSM};
use network::{Network, OrderMessage};
use orders::OrderStore;
use shared::{ButtonLight, CallButton, CarState, Direction, Timer, TimerToken};

/* Modules */
#[macro_use]
mod shared;
mod config;
mod coordinator;
mod elevator;
mod network;
mod orders;

/// Runs one car of an elevator group.
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// Id of this car, unique within the group
    #[clap(long, short, value_parser = clap::value_parser!(u8).range(0..=9))]
    id: u8,

    /// Path to the configuration file
    #[clap(long, short, default_value = "config.toml")]
    config: PathBuf,
}

/* Main */
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    unwrap_or_exit!(run(args));
}

fn run(args: Args) -> anyhow::Result<()> {
    // Load the configuration
    let config = config::load_config(&args.config)?;
    info!(
        "Starting elevator {} with {} floors",
        args.id, config.elevator.n_floors
    );

    // Connect to the hardware and find a floor
    let address = &config.hardware.driver_address;
    let elevator = Elevator::init(address, config.elevator.n_floors)
        .with_context(|| format!("Could not connect to the elevator server at {}", address))?;
    let initial_floor = elevator::calibrate(
        &elevator,
        config.hardware.poll_period(),
        config.elevator.calibration_timeout(),
    )?;

    // Hardware channels
    let (hw_motor_direction_tx, hw_motor_direction_rx) = cbc::unbounded::<Direction>();
    let (hw_button_light_tx, hw_button_light_rx) = cbc::unbounded::<ButtonLight>();
    let (hw_door_light_tx, hw_door_light_rx) = cbc::unbounded::<bool>();
    let (hw_floor_sensor_tx, hw_floor_sensor_rx) = cbc::unbounded::<u8>();
    let (hw_call_button_tx, hw_call_button_rx) = cbc::unbounded::<CallButton>();
    let (hw_stop_button_tx, hw_stop_button_rx) = cbc::unbounded::<bool>();

    // Network channels
    let (net_order_send_tx, net_order_send_rx) = cbc::unbounded::<OrderMessage>();
    let (net_order_recv_tx, net_order_recv_rx) = cbc::unbounded::<OrderMessage>();
    let (net_peer_update_tx, net_peer_update_rx) = cbc::unbounded::<udpnet::peers::PeerUpdate>();
    let (_net_peer_tx_enable_tx, net_peer_tx_enable_rx) = cbc::unbounded::<bool>();

    // Control loop channels
    let (timer_fired_tx, timer_fired_rx) = cbc::unbounded::<TimerToken>();
    let (state_tx, state_rx) = cbc::unbounded::<CarState>();
    let (terminate_tx, terminate_rx) = cbc::unbounded::<()>();

    // Start the hardware module
    let elevator_driver = ElevatorDriver::new(
        elevator,
        config.hardware.poll_period(),
        hw_motor_direction_rx,
        hw_button_light_rx,
        hw_door_light_rx,
        hw_floor_sensor_tx,
        hw_call_button_tx,
        hw_stop_button_tx,
    );
    let elevator_driver_thread = Builder::new()
        .name("elevator_driver".into())
        .spawn(move || elevator_driver.run())
        .context("Could not start the hardware driver")?;

    // Start the network module
    let network = Network::new(
        &config.network,
        args.id,
        net_order_send_rx,
        net_order_recv_tx,
        net_peer_update_tx,
        net_peer_tx_enable_rx,
    )?;
    info!("Joined the group as {}", network.id);

    // Start the timer
    let (timer, timer_handle) = Timer::new(timer_fired_tx);
    Builder::new()
        .name("timer".into())
        .spawn(move || timer.run())
        .context("Could not start the timer")?;

    // Log state changes of the car
    Builder::new()
        .name("state_log".into())
        .spawn(move || {
            let mut last = None;
            for state in state_rx.iter() {
                if last != Some(state) {
                    debug!("Car state: {:?}", state);
                    last = Some(state);
                }
            }
        })
        .context("Could not start the state logger")?;

    // Start the elevator module
    let orders = OrderStore::new(&config.elevator, timer_handle.clone(), hw_button_light_tx);
    let coordinator = Coordinator::new(args.id, orders, net_order_send_tx);
    let elevator_fsm = ElevatorFSM::new(
        &config.elevator,
        initial_floor,
        coordinator,
        hw_motor_direction_tx,
        hw_door_light_tx,
        hw_floor_sensor_rx,
        hw_call_button_rx,
        hw_stop_button_rx,
        net_order_recv_rx,
        net_peer_update_rx,
        timer_handle,
        timer_fired_rx,
        state_tx,
        terminate_rx,
    );

    let elevator_fsm_thread = Builder::new()
        .name("elevator_fsm".into())
        .spawn(move || elevator_fsm.run())
        .context("Could not start the control loop")?;

    // SIGINT and SIGTERM shut the control loop down
    ctrlc::set_handler(move || {
        let _ = terminate_tx.send(());
    })
    .context("Could not install the signal handler")?;

    elevator_fsm_thread
        .join()
        .map_err(|_| anyhow!("Control loop panicked"))??;

    // The driver stops the motor once the control loop has dropped its channels
    elevator_driver_thread
        .join()
        .map_err(|_| anyhow!("Hardware driver panicked"))?;
    info!("Elevator {} shut down", args.id);
    Ok(())
}

/***************************************/
/*             Unit tests              */
/***************************************/
