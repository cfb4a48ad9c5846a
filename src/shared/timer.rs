/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, warn};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::HallDirection;

/***************************************/
/*       Public data structures        */
/***************************************/

/// Identifies what a fired timer was armed for. The generation lets the
/// receiver tell a live timer from one that was cancelled or re-armed after
/// it had already been queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerToken {
    Dwell {
        generation: u64,
    },
    Claim {
        floor: u8,
        direction: HallDirection,
        generation: u64,
    },
}

/// Cheap, cloneable handle used to arm timers on the timer thread.
#[derive(Clone)]
pub struct TimerHandle {
    request_tx: cbc::Sender<(Instant, TimerToken)>,
}

/**
 * # Timer
 * Turns deadlines into events.
 *
 * Runs on its own thread, keeps every armed deadline in a min-heap and sends the
 * token of each expired deadline on `fired_tx`. It never touches controller state,
 * so all mutation stays on the thread that consumes `fired_tx`.
 *
 * The thread exits when every `TimerHandle` is dropped and no deadlines remain,
 * or when the receiving end of `fired_tx` is gone.
 */
pub struct Timer {
    request_rx: cbc::Receiver<(Instant, TimerToken)>,
    fired_tx: cbc::Sender<TimerToken>,
    pending: BinaryHeap<Reverse<Scheduled>>,
    sequence: u64,
}

struct Scheduled {
    deadline: Instant,
    sequence: u64,
    token: TimerToken,
}

/***************************************/
/*           Implementations           */
/***************************************/
impl TimerHandle {
    pub fn schedule(&self, token: TimerToken, after: Duration) {
        if self.request_tx.send((Instant::now() + after, token)).is_err() {
            warn!("Timer thread is gone, dropping {:?}", token);
        }
    }
}

impl Timer {
    pub fn new(fired_tx: cbc::Sender<TimerToken>) -> (Timer, TimerHandle) {
        let (request_tx, request_rx) = cbc::unbounded();
        let timer = Timer {
            request_rx,
            fired_tx,
            pending: BinaryHeap::new(),
            sequence: 0,
        };
        (timer, TimerHandle { request_tx })
    }

    pub fn run(mut self) {
        loop {
            let request = match self.pending.peek() {
                Some(Reverse(next)) => match self.request_rx.recv_deadline(next.deadline) {
                    Ok(request) => Some(request),
                    Err(cbc::RecvTimeoutError::Timeout) => None,
                    Err(cbc::RecvTimeoutError::Disconnected) => {
                        // No more requests can arrive; sleep out the remaining deadlines
                        std::thread::sleep(next.deadline.saturating_duration_since(Instant::now()));
                        None
                    }
                },
                None => match self.request_rx.recv() {
                    Ok(request) => Some(request),
                    Err(_) => {
                        debug!("Timer thread exiting");
                        return;
                    }
                },
            };

            if let Some((deadline, token)) = request {
                self.sequence += 1;
                self.pending.push(Reverse(Scheduled {
                    deadline,
                    sequence: self.sequence,
                    token,
                }));
            }

            if !self.fire_expired() {
                debug!("Timer consumer is gone, exiting");
                return;
            }
        }
    }

    fn fire_expired(&mut self) -> bool {
        let now = Instant::now();
        while let Some(Reverse(next)) = self.pending.peek() {
            if next.deadline > now {
                break;
            }
            let token = next.token;
            self.pending.pop();
            if self.fired_tx.send(token).is_err() {
                return false;
            }
        }
        true
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod timer_tests {
    use super::{Timer, TimerToken};
    use crate::shared::HallDirection;
    use crossbeam_channel::unbounded;
    use std::thread::spawn;
    use std::time::Duration;

    #[test]
    fn test_timers_fire_in_deadline_order() {
        // Arrange
        let (fired_tx, fired_rx) = unbounded::<TimerToken>();
        let (timer, handle) = Timer::new(fired_tx);
        let timer_thread = spawn(move || timer.run());

        let late = TimerToken::Dwell { generation: 1 };
        let early = TimerToken::Claim {
            floor: 2,
            direction: HallDirection::Up,
            generation: 7,
        };

        // Act
        handle.schedule(late, Duration::from_millis(120));
        handle.schedule(early, Duration::from_millis(20));

        // Assert
        let timeout = Duration::from_secs(2);
        assert_eq!(fired_rx.recv_timeout(timeout).unwrap(), early);
        assert_eq!(fired_rx.recv_timeout(timeout).unwrap(), late);

        // Cleanup
        drop(handle);
        timer_thread.join().unwrap();
    }

    #[test]
    fn test_each_token_fires_once() {
        // Arrange
        let (fired_tx, fired_rx) = unbounded::<TimerToken>();
        let (timer, handle) = Timer::new(fired_tx);
        let timer_thread = spawn(move || timer.run());
        let token = TimerToken::Dwell { generation: 3 };

        // Act
        handle.schedule(token, Duration::from_millis(10));

        // Assert
        assert_eq!(fired_rx.recv_timeout(Duration::from_secs(2)).unwrap(), token);
        assert!(fired_rx.recv_timeout(Duration::from_millis(200)).is_err());

        // Cleanup
        drop(handle);
        timer_thread.join().unwrap();
    }

    #[test]
    fn test_pending_deadlines_fire_after_handle_is_dropped() {
        // Arrange
        let (fired_tx, fired_rx) = unbounded::<TimerToken>();
        let (timer, handle) = Timer::new(fired_tx);
        let timer_thread = spawn(move || timer.run());
        let token = TimerToken::Dwell { generation: 9 };

        // Act
        handle.schedule(token, Duration::from_millis(30));
        drop(handle);

        // Assert
        assert_eq!(fired_rx.recv_timeout(Duration::from_secs(2)).unwrap(), token);
        timer_thread.join().unwrap();
    }
}
