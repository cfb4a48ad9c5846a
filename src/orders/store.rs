/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::ElevatorConfig;
use crate::shared::{ButtonKind, ButtonLight, Direction, HallDirection, TimerHandle, TimerToken};

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    /// Announced to peers, nobody has acknowledged it yet.
    Announced,
    /// A peer acknowledged it; the timer runs on the longer interval.
    Accepted,
    /// The timer fired. Stays in the table until the call is cleared.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub generation: u64,
    pub state: ClaimState,
}

/**
 * # Order Store
 * Everything this car still has to serve, and the hall calls it is waiting to see claimed.
 *
 * The pending matrix is kept as a hall table and a cab table; `is_pending(dir, floor)` is
 * their union, so a car call makes a floor pending in both directions. Claims live in a
 * table indexed by floor and hall direction. Each claim carries the generation of the
 * timer armed for it, and a fired timer only counts if its generation is still current.
 *
 * The store drives the button lamps for the entries it sets and clears.
 *
 * # Fields
 * - `hall_calls`:              `[floor][HallDirection::index()]` live hall calls.
 * - `car_calls`:               `[floor]` live car calls.
 * - `claims`:                  `[floor][HallDirection::index()]` outstanding claims.
 * - `generation`:              Last generation handed out to a claim timer.
 * - `timer`:                   Arms claim expiry timers.
 * - `hw_button_light_tx`:      Sends button lamp commands to the hardware thread.
 */
pub struct OrderStore {
    n_floors: u8,
    hall_calls: Vec<[bool; 2]>,
    car_calls: Vec<bool>,
    claims: Vec<[Option<Claim>; 2]>,
    generation: u64,
    claim_timeout: Duration,
    accepted_claim_timeout: Duration,
    timer: TimerHandle,
    hw_button_light_tx: cbc::Sender<ButtonLight>,
}

/***************************************/
/*             Public API              */
/***************************************/
impl OrderStore {
    pub fn new(
        config: &ElevatorConfig,
        timer: TimerHandle,
        hw_button_light_tx: cbc::Sender<ButtonLight>,
    ) -> OrderStore {
        let n_floors = config.n_floors as usize;
        OrderStore {
            n_floors: config.n_floors,
            hall_calls: vec![[false; 2]; n_floors],
            car_calls: vec![false; n_floors],
            claims: vec![[None; 2]; n_floors],
            generation: 0,
            claim_timeout: config.claim_timeout(),
            accepted_claim_timeout: config.accepted_claim_timeout(),
            timer,
            hw_button_light_tx,
        }
    }

    pub fn n_floors(&self) -> u8 {
        self.n_floors
    }

    /// Returns whether the car call was new.
    pub fn register_car_call(&mut self, floor: u8) -> bool {
        self.check_floor(floor);
        let is_new = !self.car_calls[floor as usize];
        self.car_calls[floor as usize] = true;
        self.set_light(floor, ButtonKind::Cab, true);
        is_new
    }

    /// Returns whether the hall call was new. A call that is already pending keeps
    /// its claim untouched.
    pub fn register_hall_call(&mut self, floor: u8, direction: HallDirection) -> bool {
        self.check_floor(floor);
        self.set_light(floor, ButtonKind::hall(direction), true);

        if self.hall_calls[floor as usize][direction.index()] {
            debug!("Hall call {:?} at floor {} already pending", direction, floor);
            return false;
        }

        self.hall_calls[floor as usize][direction.index()] = true;
        self.arm_claim(floor, direction, ClaimState::Announced, self.claim_timeout);
        true
    }

    /// A peer acknowledged the hall call. Returns false if there is no claim for it,
    /// which happens for late or duplicated acknowledgements of served calls.
    pub fn accept_claim(&mut self, floor: u8, direction: HallDirection) -> bool {
        self.check_floor(floor);
        if self.claims[floor as usize][direction.index()].is_none() {
            warn!(
                "Acceptance for unknown order {:?} at floor {}, ignoring",
                direction, floor
            );
            return false;
        }

        self.arm_claim(
            floor,
            direction,
            ClaimState::Accepted,
            self.accepted_claim_timeout,
        );
        true
    }

    /// The car stopped at `floor` while committed to `served`. Returns the hall
    /// directions that were cleared.
    pub fn clear_order(&mut self, floor: u8, served: Direction) -> Vec<HallDirection> {
        self.check_floor(floor);

        let directions: &[HallDirection] = match served {
            Direction::Up => &[HallDirection::Up],
            Direction::Down => &[HallDirection::Down],
            Direction::Stop => &[HallDirection::Up, HallDirection::Down],
        };

        let mut cleared = Vec::new();
        for &direction in directions {
            if self.remove_hall_call(floor, direction) {
                cleared.push(direction);
            }
        }

        // The car stopped here, so the car call is served whichever way it travels
        self.car_calls[floor as usize] = false;
        self.set_light(floor, ButtonKind::Cab, false);

        cleared
    }

    /// A peer served the hall call. Leaves any car call at the floor alone.
    pub fn clear_hall_call(&mut self, floor: u8, direction: HallDirection) -> bool {
        self.check_floor(floor);
        self.remove_hall_call(floor, direction)
    }

    /// Called when a claim timer fires. Returns true once for a live claim whose
    /// timer generation still matches; stale and repeated firings return false.
    pub fn expire_claim(&mut self, floor: u8, direction: HallDirection, generation: u64) -> bool {
        self.check_floor(floor);
        match self.claims[floor as usize][direction.index()].as_mut() {
            Some(claim) if claim.generation == generation && claim.state != ClaimState::Expired => {
                claim.state = ClaimState::Expired;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, direction: HallDirection, floor: u8) -> bool {
        self.check_floor(floor);
        self.hall_calls[floor as usize][direction.index()] || self.car_calls[floor as usize]
    }

    pub fn is_pending_at(&self, floor: u8) -> bool {
        self.is_pending(HallDirection::Up, floor) || self.is_pending(HallDirection::Down, floor)
    }

    #[cfg(test)]
    pub fn has_hall_call(&self, floor: u8, direction: HallDirection) -> bool {
        self.check_floor(floor);
        self.hall_calls[floor as usize][direction.index()]
    }

    #[cfg(test)]
    pub fn has_car_call(&self, floor: u8) -> bool {
        self.check_floor(floor);
        self.car_calls[floor as usize]
    }

    #[cfg(test)]
    pub fn claim(&self, floor: u8, direction: HallDirection) -> Option<Claim> {
        self.check_floor(floor);
        self.claims[floor as usize][direction.index()]
    }

    /***************************************/
    /*           Private helpers           */
    /***************************************/
    fn check_floor(&self, floor: u8) {
        assert!(
            floor < self.n_floors,
            "floor {} out of range, building has {} floors",
            floor,
            self.n_floors
        );
    }

    fn remove_hall_call(&mut self, floor: u8, direction: HallDirection) -> bool {
        let was_pending = self.hall_calls[floor as usize][direction.index()];
        self.hall_calls[floor as usize][direction.index()] = false;

        // Dropping the claim is the cancellation; a timer already queued for it is stale
        if self.claims[floor as usize][direction.index()].take().is_some() {
            debug!("Claim {:?} at floor {} cancelled", direction, floor);
        }

        if was_pending {
            self.set_light(floor, ButtonKind::hall(direction), false);
            info!("Hall call {:?} at floor {} cleared", direction, floor);
        }
        was_pending
    }

    fn arm_claim(
        &mut self,
        floor: u8,
        direction: HallDirection,
        state: ClaimState,
        timeout: Duration,
    ) {
        self.generation += 1;
        let generation = self.generation;
        self.claims[floor as usize][direction.index()] = Some(Claim { generation, state });
        self.timer.schedule(
            TimerToken::Claim {
                floor,
                direction,
                generation,
            },
            timeout,
        );
    }

    fn set_light(&self, floor: u8, kind: ButtonKind, on: bool) {
        let light = ButtonLight { floor, kind, on };
        if self.hw_button_light_tx.send(light).is_err() {
            warn!("Hardware thread is gone, dropping {:?}", light);
        }
    }
}
