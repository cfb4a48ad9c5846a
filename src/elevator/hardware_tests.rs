/*
 * Unit tests for the hardware driver
 *
 * The unit tests follows the Arrange, Act, Assert pattern. The physical elevator is
 * replaced by `FakeIo`, whose signals the test flips while the driver polls it.
 *
 * Tests:
 *  - test_calibrate_at_known_floor
 *  - test_calibrate_drives_down_until_floor
 *  - test_calibrate_times_out
 *  - test_driver_emits_edges_only
 *  - test_driver_reports_return_to_same_floor
 *  - test_driver_applies_commands
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod hardware_tests {
    use crate::elevator::hardware::{calibrate, ElevatorDriver, ElevatorIo};
    use crate::shared::{ButtonKind, ButtonLight, CallButton, Direction};
    use crossbeam_channel::unbounded;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::thread::{sleep, spawn};
    use std::time::Duration;

    const POLL: Duration = Duration::from_millis(2);
    const WAIT: Duration = Duration::from_secs(2);

    #[derive(Default)]
    struct FakeState {
        floor: Option<u8>,
        // Readings returned before falling back to `floor`
        scripted_floors: VecDeque<Option<u8>>,
        stop: bool,
        pressed: Vec<(u8, ButtonKind)>,
        motor: Vec<Direction>,
        door_lamp: Option<bool>,
        button_lamps: Vec<(u8, ButtonKind, bool)>,
        floor_indicator: Option<u8>,
        stop_lamp: bool,
    }

    #[derive(Clone, Default)]
    struct FakeIo {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeIo {
        fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
            f(&mut self.state.lock().unwrap())
        }
    }

    impl ElevatorIo for FakeIo {
        fn num_floors(&self) -> u8 {
            4
        }

        fn read_floor(&self) -> Option<u8> {
            self.with(|s| match s.scripted_floors.pop_front() {
                Some(reading) => reading,
                None => s.floor,
            })
        }

        fn read_button(&self, floor: u8, kind: ButtonKind) -> bool {
            self.with(|s| s.pressed.contains(&(floor, kind)))
        }

        fn read_stop(&self) -> bool {
            self.with(|s| s.stop)
        }

        fn set_motor(&self, direction: Direction) {
            self.with(|s| s.motor.push(direction));
        }

        fn set_door_lamp(&self, on: bool) {
            self.with(|s| s.door_lamp = Some(on));
        }

        fn set_button_lamp(&self, floor: u8, kind: ButtonKind, on: bool) {
            self.with(|s| s.button_lamps.push((floor, kind, on)));
        }

        fn set_floor_indicator(&self, floor: u8) {
            self.with(|s| s.floor_indicator = Some(floor));
        }

        fn set_stop_lamp(&self, on: bool) {
            self.with(|s| s.stop_lamp = on);
        }
    }

    #[test]
    fn test_calibrate_at_known_floor() {
        // Arrange
        let io = FakeIo::default();
        io.with(|s| s.floor = Some(2));

        // Act
        let floor = calibrate(&io, POLL, WAIT).unwrap();

        // Assert
        assert_eq!(floor, 2);
        assert!(io.with(|s| s.motor.is_empty()));
        assert_eq!(io.with(|s| s.floor_indicator), Some(2));
    }

    #[test]
    fn test_calibrate_drives_down_until_floor() {
        // Arrange
        let io = FakeIo::default();
        io.with(|s| {
            s.scripted_floors = VecDeque::from(vec![None, None, None]);
            s.floor = Some(1);
        });

        // Act
        let floor = calibrate(&io, POLL, WAIT).unwrap();

        // Assert
        assert_eq!(floor, 1);
        assert_eq!(io.with(|s| s.motor.clone()), vec![Direction::Down, Direction::Stop]);
        assert_eq!(io.with(|s| s.floor_indicator), Some(1));
    }

    #[test]
    fn test_calibrate_times_out() {
        // Arrange
        let io = FakeIo::default();

        // Act
        let result = calibrate(&io, POLL, Duration::from_millis(20));

        // Assert
        assert!(result.is_err());
        assert_eq!(io.with(|s| s.motor.last().copied()), Some(Direction::Stop));
    }

    #[test]
    fn test_driver_emits_edges_only() {
        // Arrange
        let io = FakeIo::default();
        io.with(|s| s.floor = Some(0));
        let (_hw_motor_direction_tx, hw_motor_direction_rx) = unbounded::<Direction>();
        let (_hw_button_light_tx, hw_button_light_rx) = unbounded::<ButtonLight>();
        let (hw_door_light_tx, hw_door_light_rx) = unbounded::<bool>();
        let (hw_floor_sensor_tx, hw_floor_sensor_rx) = unbounded::<u8>();
        let (hw_call_button_tx, hw_call_button_rx) = unbounded::<CallButton>();
        let (hw_stop_button_tx, hw_stop_button_rx) = unbounded::<bool>();
        let driver = ElevatorDriver::new(
            io.clone(),
            POLL,
            hw_motor_direction_rx,
            hw_button_light_rx,
            hw_door_light_rx,
            hw_floor_sensor_tx,
            hw_call_button_tx,
            hw_stop_button_tx,
        );
        let driver_thread = spawn(move || driver.run());

        // Act
        io.with(|s| {
            s.pressed.push((2, ButtonKind::HallDown));
            s.stop = true;
        });
        sleep(Duration::from_millis(50));
        io.with(|s| {
            s.pressed.clear();
            s.stop = false;
        });

        // Assert
        assert_eq!(
            hw_call_button_rx.recv_timeout(WAIT).unwrap(),
            CallButton { floor: 2, kind: ButtonKind::HallDown }
        );
        assert_eq!(hw_stop_button_rx.recv_timeout(WAIT).unwrap(), true);
        assert_eq!(hw_stop_button_rx.recv_timeout(WAIT).unwrap(), false);
        sleep(Duration::from_millis(50));
        assert!(hw_call_button_rx.try_recv().is_err());

        // Already at floor 0 when the driver started, so no arrival was reported
        assert!(hw_floor_sensor_rx.try_recv().is_err());

        // Cleanup
        drop(hw_door_light_tx);
        driver_thread.join().unwrap();
    }

    #[test]
    fn test_driver_reports_return_to_same_floor() {
        // Arrange
        let io = FakeIo::default();
        io.with(|s| s.floor = Some(1));
        let (_hw_motor_direction_tx, hw_motor_direction_rx) = unbounded::<Direction>();
        let (_hw_button_light_tx, hw_button_light_rx) = unbounded::<ButtonLight>();
        let (hw_door_light_tx, hw_door_light_rx) = unbounded::<bool>();
        let (hw_floor_sensor_tx, hw_floor_sensor_rx) = unbounded::<u8>();
        let (hw_call_button_tx, _hw_call_button_rx) = unbounded::<CallButton>();
        let (hw_stop_button_tx, _hw_stop_button_rx) = unbounded::<bool>();
        let driver = ElevatorDriver::new(
            io.clone(),
            POLL,
            hw_motor_direction_rx,
            hw_button_light_rx,
            hw_door_light_rx,
            hw_floor_sensor_tx,
            hw_call_button_tx,
            hw_stop_button_tx,
        );
        let driver_thread = spawn(move || driver.run());

        // Act
        io.with(|s| s.floor = None);
        sleep(Duration::from_millis(30));
        io.with(|s| s.floor = Some(1));

        // Assert
        assert_eq!(hw_floor_sensor_rx.recv_timeout(WAIT).unwrap(), 1);
        assert_eq!(io.with(|s| s.floor_indicator), Some(1));

        // Cleanup
        drop(hw_door_light_tx);
        driver_thread.join().unwrap();
    }

    #[test]
    fn test_driver_applies_commands() {
        // Arrange
        let io = FakeIo::default();
        io.with(|s| s.floor = Some(0));
        let (hw_motor_direction_tx, hw_motor_direction_rx) = unbounded::<Direction>();
        let (hw_button_light_tx, hw_button_light_rx) = unbounded::<ButtonLight>();
        let (hw_door_light_tx, hw_door_light_rx) = unbounded::<bool>();
        let (hw_floor_sensor_tx, _hw_floor_sensor_rx) = unbounded::<u8>();
        let (hw_call_button_tx, _hw_call_button_rx) = unbounded::<CallButton>();
        let (hw_stop_button_tx, _hw_stop_button_rx) = unbounded::<bool>();
        let driver = ElevatorDriver::new(
            io.clone(),
            POLL,
            hw_motor_direction_rx,
            hw_button_light_rx,
            hw_door_light_rx,
            hw_floor_sensor_tx,
            hw_call_button_tx,
            hw_stop_button_tx,
        );
        let driver_thread = spawn(move || driver.run());

        // Act
        hw_motor_direction_tx.send(Direction::Up).unwrap();
        hw_button_light_tx
            .send(ButtonLight { floor: 3, kind: ButtonKind::Cab, on: true })
            .unwrap();
        hw_door_light_tx.send(true).unwrap();
        sleep(Duration::from_millis(100));

        // Assert
        io.with(|s| {
            assert_eq!(s.motor, vec![Direction::Up]);
            assert_eq!(s.button_lamps, vec![(3, ButtonKind::Cab, true)]);
            assert_eq!(s.door_lamp, Some(true));
        });

        // Act: the control loop goes away
        drop(hw_motor_direction_tx);
        driver_thread.join().unwrap();

        // Assert: the car is not left moving
        assert_eq!(io.with(|s| s.motor.clone()), vec![Direction::Up, Direction::Stop]);
    }
}
