use std::process;
use std::thread::Builder;

use crate::config::NetworkConfig;
use crate::network::OrderMessage;
use anyhow::Context;
use crossbeam_channel as cbc;
use log::{error, info};
use network_rust::udpnet;

/**
 * Facilitates network communications for the elevator system.
 *
 * Order messages are broadcast over UDP on `msg_port` and every car, including the
 * sender, receives them. Peer discovery runs on `peer_port` with periodic heartbeats
 * carrying the car's id. The transport is best effort: datagrams may be lost,
 * duplicated or reordered, and the coordinator is built to live with that.
 *
 * # Network
 * Struct for managing network communications.
 *
 * # Fields
 * - `id`: Heartbeat id of this node, `elevator-<id>`.
 *
 * # Constructor arguments
 * - `config`:                  Network configuration settings.
 * - `elevator_id`:             Numeric id of this car, from the command line.
 * - `order_send_rx`:           Receiver for order messages to broadcast.
 * - `order_recv_tx`:           Sender for forwarding received order messages.
 * - `peer_update_tx`:          Sender for forwarding received peer updates.
 * - `peer_tx_enable_rx`:       Receiver to enable/disable peer ID broadcasting.
 *
 */

pub struct Network {
    pub id: String,
}

impl Network {
    pub fn new(
        config: &NetworkConfig,
        elevator_id: u8,
        order_send_rx: cbc::Receiver<OrderMessage>,
        order_recv_tx: cbc::Sender<OrderMessage>,
        peer_update_tx: cbc::Sender<udpnet::peers::PeerUpdate>,
        peer_tx_enable_rx: cbc::Receiver<bool>,
    ) -> anyhow::Result<Network> {
        let id = format!("elevator-{}", elevator_id);
        let msg_port = config.msg_port;
        let peer_port = config.peer_port;
        let id_tx = id.clone();

        // Thread for broadcasting peer ID
        Builder::new()
            .name("peer_tx".into())
            .spawn(move || {
                if udpnet::peers::tx(peer_port, id_tx, peer_tx_enable_rx).is_err() {
                    error!("Peer heartbeat on port {} failed", peer_port);
                    process::exit(1);
                }
            })
            .context("Failed to spawn peer_tx thread")?;

        // Thread for receiving and forwarding peer updates on port 'peer_port'
        Builder::new()
            .name("peer_rx".into())
            .spawn(move || {
                if udpnet::peers::rx(peer_port, peer_update_tx).is_err() {
                    error!("Peer listener on port {} failed", peer_port);
                    process::exit(1);
                }
            })
            .context("Failed to spawn peer_rx thread")?;

        // Thread for broadcasting order messages handed over by the control loop
        Builder::new()
            .name("order_tx".into())
            .spawn(move || {
                if udpnet::bcast::tx(msg_port, order_send_rx).is_err() {
                    error!("Order broadcast on port {} failed", msg_port);
                    process::exit(1);
                }
            })
            .context("Failed to spawn order_tx thread")?;

        // Thread for receiving order messages. Malformed datagrams are dropped by the receiver
        Builder::new()
            .name("order_rx".into())
            .spawn(move || {
                if udpnet::bcast::rx(msg_port, order_recv_tx).is_err() {
                    error!("Order listener on port {} failed", msg_port);
                    process::exit(1);
                }
            })
            .context("Failed to spawn order_rx thread")?;

        info!("Network up as {} (orders: {}, peers: {})", id, msg_port, peer_port);
        Ok(Network { id })
    }
}
