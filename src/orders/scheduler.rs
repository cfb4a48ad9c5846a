/*
 * Dispatch decisions for a single car.
 *
 * Collective control (SCAN): keep going while there is work ahead in the committed
 * direction, reverse only when there is none. Every function here is a pure query
 * over the order store; the caller owns the car's direction and motor.
 */

/***************************************/
/*           Local modules             */
/***************************************/
use crate::orders::OrderStore;
use crate::shared::Direction;

/***************************************/
/*             Public API              */
/***************************************/

/// Whether a car committed to `direction` must stop when it reaches `floor`.
///
/// A stationary car never stops through this check. Besides calls in the committed
/// direction, the car makes a turnaround stop for an opposite call when nothing is
/// pending further ahead.
pub fn should_stop(orders: &OrderStore, floor: u8, direction: Direction) -> bool {
    let Some(hall) = direction.as_hall() else {
        return false;
    };

    if orders.is_pending(hall, floor) {
        return true;
    }

    orders.is_pending(hall.opposite(), floor) && !has_any_ahead(orders, floor, direction)
}

/// Which direction a stop at `floor` serves, for `OrderStore::clear_order`.
///
/// A car that keeps going serves only its committed direction. A car with nothing
/// pending further ahead turns around or goes idle here, so the stop serves both hall
/// calls at the floor (`Stop`).
pub fn served_direction(orders: &OrderStore, floor: u8, direction: Direction) -> Direction {
    match direction.as_hall() {
        Some(hall) if orders.is_pending(hall, floor) && has_any_ahead(orders, floor, direction) => {
            direction
        }
        _ => Direction::Stop,
    }
}

/// The direction to travel next from `floor`, given the committed `direction`.
pub fn next_direction(orders: &OrderStore, floor: u8, direction: Direction) -> Direction {
    let order = match direction {
        Direction::Up => [Direction::Up, Direction::Down],
        Direction::Down | Direction::Stop => [Direction::Down, Direction::Up],
    };

    // Calls that will be served on the way
    for candidate in order {
        if has_same_direction_ahead(orders, floor, candidate) {
            return candidate;
        }
    }

    // Calls pointing back toward the car, reached by overshooting and turning around
    for candidate in order {
        if has_any_ahead(orders, floor, candidate) {
            return candidate;
        }
    }

    Direction::Stop
}

/***************************************/
/*           Private helpers           */
/***************************************/
fn any_ahead(
    orders: &OrderStore,
    floor: u8,
    direction: Direction,
    pending: impl Fn(u8) -> bool,
) -> bool {
    match direction {
        Direction::Up => ((floor + 1)..orders.n_floors()).any(pending),
        Direction::Down => (0..floor).rev().any(pending),
        Direction::Stop => false,
    }
}

fn has_same_direction_ahead(orders: &OrderStore, floor: u8, direction: Direction) -> bool {
    match direction.as_hall() {
        Some(hall) => any_ahead(orders, floor, direction, |f| orders.is_pending(hall, f)),
        None => false,
    }
}

fn has_any_ahead(orders: &OrderStore, floor: u8, direction: Direction) -> bool {
    any_ahead(orders, floor, direction, |f| orders.is_pending_at(f))
}
