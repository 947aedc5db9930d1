use std::thread;
use std::time::Duration;

use log::{debug, info};

/// Motor channel assignments on the driver board.
const IDX_SPEED: usize = 0;
const IDX_POINT_LEFT: usize = 2;
const IDX_POINT_RIGHT: usize = 3;

const POINT_PWM: i8 = 127;

/// Boundary to the physical motor driver. One signed PWM value per logical
/// channel; writes are fire-and-forget.
pub(crate) trait MotorDriver: Send {
    fn set_channel_speed(&mut self, channel: usize, value: i8);
}

/// Placeholder transport that logs every channel write. Swapped for the real
/// board transport on the layout.
pub(crate) struct LogMotor;

impl MotorDriver for LogMotor {
    fn set_channel_speed(&mut self, channel: usize, value: i8) {
        debug!("motor channel {channel} <- {value}");
    }
}

/// Traction and points output. Owns the signed traction command and the
/// timed actuation pulse for the points mechanism.
pub(crate) struct TrainOutput {
    motor: Box<dyn MotorDriver>,
    pulse: Duration,
}

impl TrainOutput {
    pub fn new(motor: Box<dyn MotorDriver>, pulse: Duration) -> Self {
        Self { motor, pulse }
    }

    /// Brings the traction channel to a known zero at startup.
    pub fn begin(&mut self) {
        self.motor.set_channel_speed(IDX_SPEED, 0);
    }

    pub fn set_speed(&mut self, value: i8) {
        self.motor.set_channel_speed(IDX_SPEED, value);
    }

    /// Throws the points. The actuator pair is energized, held for the
    /// configured pulse so the mechanism completes its travel, then released.
    pub fn drive_points(&mut self, diverging: bool) {
        let pwm = if diverging { -POINT_PWM } else { POINT_PWM };
        info!(
            "points -> {}",
            if diverging { "diverging" } else { "through" }
        );
        self.motor.set_channel_speed(IDX_POINT_LEFT, pwm);
        self.motor.set_channel_speed(IDX_POINT_RIGHT, pwm);
        thread::sleep(self.pulse);
        self.motor.set_channel_speed(IDX_POINT_LEFT, 0);
        self.motor.set_channel_speed(IDX_POINT_RIGHT, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingMotor {
        writes: Arc<Mutex<Vec<(usize, i8)>>>,
    }

    impl MotorDriver for RecordingMotor {
        fn set_channel_speed(&mut self, channel: usize, value: i8) {
            self.writes.lock().unwrap().push((channel, value));
        }
    }

    #[test]
    fn traction_writes_go_to_channel_zero() {
        let motor = RecordingMotor::default();
        let writes = Arc::clone(&motor.writes);
        let mut train = TrainOutput::new(Box::new(motor), Duration::ZERO);

        train.begin();
        train.set_speed(42);
        train.set_speed(-17);

        assert_eq!(*writes.lock().unwrap(), vec![(0, 0), (0, 42), (0, -17)]);
    }

    #[test]
    fn points_throw_is_a_pulse_then_release() {
        let motor = RecordingMotor::default();
        let writes = Arc::clone(&motor.writes);
        let mut train = TrainOutput::new(Box::new(motor), Duration::ZERO);

        train.drive_points(true);
        assert_eq!(
            *writes.lock().unwrap(),
            vec![(2, -127), (3, -127), (2, 0), (3, 0)]
        );

        writes.lock().unwrap().clear();
        train.drive_points(false);
        assert_eq!(
            *writes.lock().unwrap(),
            vec![(2, 127), (3, 127), (2, 0), (3, 0)]
        );
    }
}
