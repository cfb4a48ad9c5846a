/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::network::{MessageKind, OrderMessage};
use crate::orders::OrderStore;
use crate::shared::{Direction, HallDirection};

/***************************************/
/*             Public API              */
/***************************************/

/**
 * # Coordinator
 * Bridges local button presses and the network.
 *
 * Every car keeps every hall call it hears about, so each one decides on its own
 * whether to go for it. A car that serves a hall call broadcasts `Completed` and the
 * others retract it. Claim timers are what keeps an orphaned call alive: when one
 * expires without anybody acknowledging the call, it is announced again and the
 * control loop gets a nudge to reschedule.
 *
 * Runs on the control loop's thread; it has no thread or channel receivers of its own.
 *
 * # Fields
 * - `local_id`:                Id of this car. Messages carrying it are our own echo.
 * - `orders`:                  The order store, owned here.
 * - `net_order_send_tx`:       Sends order messages to the broadcast thread.
 */
pub struct Coordinator {
    local_id: u8,
    orders: OrderStore,
    net_order_send_tx: cbc::Sender<OrderMessage>,
}

impl Coordinator {
    pub fn new(
        local_id: u8,
        orders: OrderStore,
        net_order_send_tx: cbc::Sender<OrderMessage>,
    ) -> Coordinator {
        Coordinator {
            local_id,
            orders,
            net_order_send_tx,
        }
    }

    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    pub fn cab_button_pressed(&mut self, floor: u8) {
        if self.orders.register_car_call(floor) {
            info!("Car call to floor {}", floor);
        }
    }

    pub fn hall_button_pressed(&mut self, floor: u8, direction: HallDirection) {
        if self.orders.register_hall_call(floor, direction) {
            info!("Hall call {:?} at floor {}", direction, floor);
        }

        // Announced on every press, so a lost announcement gets another chance
        self.broadcast(MessageKind::NewOrder, floor, direction);
    }

    /// Applies a message from the network. Returns whether the pending orders
    /// changed, which means scheduling should be re-run.
    pub fn handle_message(&mut self, message: OrderMessage) -> bool {
        if message.origin == self.local_id {
            return false;
        }

        if message.floor >= self.orders.n_floors() {
            warn!(
                "Dropping {:?} from elevator {} for floor {}, out of range",
                message.kind, message.origin, message.floor
            );
            return false;
        }

        match message.kind {
            MessageKind::NewOrder => {
                let is_new = self.orders.register_hall_call(message.floor, message.direction);
                if is_new {
                    info!(
                        "Elevator {} announced hall call {:?} at floor {}",
                        message.origin, message.direction, message.floor
                    );
                }
                self.broadcast(MessageKind::OrderAccepted, message.floor, message.direction);
                is_new
            }
            MessageKind::OrderAccepted => {
                if self.orders.accept_claim(message.floor, message.direction) {
                    debug!(
                        "Elevator {} accepted hall call {:?} at floor {}",
                        message.origin, message.direction, message.floor
                    );
                }
                false
            }
            MessageKind::Completed => {
                let cleared = self.orders.clear_hall_call(message.floor, message.direction);
                if cleared {
                    info!(
                        "Elevator {} served hall call {:?} at floor {}",
                        message.origin, message.direction, message.floor
                    );
                }
                cleared
            }
        }
    }

    /// A claim timer fired. Returns whether the order went unclaimed, which means
    /// scheduling should be re-run.
    pub fn claim_expired(&mut self, floor: u8, direction: HallDirection, generation: u64) -> bool {
        if !self.orders.expire_claim(floor, direction, generation) {
            debug!(
                "Ignoring stale claim timer for {:?} at floor {} (generation {})",
                direction, floor, generation
            );
            return false;
        }

        warn!("Hall call {:?} at floor {} is unclaimed, announcing again", direction, floor);
        self.broadcast(MessageKind::NewOrder, floor, direction);
        true
    }

    /// The car stopped at `floor` while committed to `served`.
    pub fn order_served(&mut self, floor: u8, served: Direction) {
        for direction in self.orders.clear_order(floor, served) {
            self.broadcast(MessageKind::Completed, floor, direction);
        }
    }

    fn broadcast(&self, kind: MessageKind, floor: u8, direction: HallDirection) {
        let message = OrderMessage::new(self.local_id, kind, floor, direction);
        if self.net_order_send_tx.send(message).is_err() {
            warn!("Network thread is gone, dropping {:?}", message);
        }
    }
}
