use crate::config::{
    ANALOG_CHANNELS, DEFAULT_PWM, FLOOR_SENSOR_CHANNELS, PWM_VELOCITY_DIVISOR, ROBOT_HEIGHT,
    ROBOT_LENGTH, ROBOT_WIDTH,
};
use crate::types::Point;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Digital output latch driving the two motor H-bridges.
///
/// | bit | meaning                         |
/// |-----|---------------------------------|
/// | 0   | right wheel contribution -1     |
/// | 1   | right wheel contribution +1     |
/// | 2   | left wheel contribution -1      |
/// | 3   | left wheel contribution +1      |
///
/// Forward and reverse bits for the same wheel cancel out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitalLatch(u8);

impl DigitalLatch {
    pub const RIGHT_REVERSE: u8 = 0b0001;
    pub const RIGHT_FORWARD: u8 = 0b0010;
    pub const LEFT_REVERSE: u8 = 0b0100;
    pub const LEFT_FORWARD: u8 = 0b1000;
    pub const MASK: u8 = 0b1111;

    /// Latch from raw bits; anything above bit 3 is not wired.
    pub fn from_bits_truncate(bits: u8) -> Self {
        DigitalLatch(bits & Self::MASK)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    fn contribution(self, forward: u8, reverse: u8) -> f64 {
        let mut direction = 0.0;
        if self.0 & forward != 0 {
            direction += 1.0;
        }
        if self.0 & reverse != 0 {
            direction -= 1.0;
        }
        direction
    }

    /// Signed unit drive of the right motor: -1, 0 or +1.
    pub fn right_direction(self) -> f64 {
        self.contribution(Self::RIGHT_FORWARD, Self::RIGHT_REVERSE)
    }

    /// Signed unit drive of the left motor: -1, 0 or +1.
    pub fn left_direction(self) -> f64 {
        self.contribution(Self::LEFT_FORWARD, Self::LEFT_REVERSE)
    }
}

/// Wheel speed in arena units per second for a direction and a PWM duty.
pub fn wheel_velocity(direction: f64, pwm: u8) -> f64 {
    direction * (pwm as f64 / PWM_VELOCITY_DIVISOR)
}

// Register-mapped state of one robot slot
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    pub slot: usize,
    pub active: bool, // A client is connected to this slot
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub angle: f64, // Radians, counter-clockwise from +x
    pub width: f64,
    pub length: f64,
    pub height: f64,
    pub latch: DigitalLatch,
    pub pwm_left: u8,
    pub pwm_right: u8,
    pub analog: [u8; ANALOG_CHANNELS],
    pub left_wheel_velocity: f64,  // Derived each tick
    pub right_wheel_velocity: f64, // Derived each tick
}

impl RobotState {
    pub fn new(slot: usize) -> Self {
        RobotState {
            slot,
            active: false,
            name: String::new(),
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            width: ROBOT_WIDTH,
            length: ROBOT_LENGTH,
            height: ROBOT_HEIGHT,
            latch: DigitalLatch::default(),
            pwm_left: DEFAULT_PWM,
            pwm_right: DEFAULT_PWM,
            analog: [0; ANALOG_CHANNELS],
            left_wheel_velocity: 0.0,
            right_wheel_velocity: 0.0,
        }
    }

    /// Restore power-on register values and place the robot at a pose.
    /// Connection state (`active`, `name`) belongs to the register server
    /// and is left untouched.
    pub fn reinitialize(&mut self, x: f64, y: f64, angle: f64) {
        self.x = x;
        self.y = y;
        self.angle = angle;
        self.width = ROBOT_WIDTH;
        self.length = ROBOT_LENGTH;
        self.height = ROBOT_HEIGHT;
        self.latch = DigitalLatch::default();
        self.pwm_left = DEFAULT_PWM;
        self.pwm_right = DEFAULT_PWM;
        self.analog = [0; ANALOG_CHANNELS];
        self.left_wheel_velocity = 0.0;
        self.right_wheel_velocity = 0.0;
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Recompute both wheel velocities from the latch and PWM registers.
    pub fn update_wheel_velocities(&mut self) {
        self.right_wheel_velocity = wheel_velocity(self.latch.right_direction(), self.pwm_right);
        self.left_wheel_velocity = wheel_velocity(self.latch.left_direction(), self.pwm_left);
    }

    /// Front-left, front-right, back-left, back-right readings.
    pub fn floor_sensors(&self) -> [u8; FLOOR_SENSOR_CHANNELS] {
        let mut readings = [0; FLOOR_SENSOR_CHANNELS];
        readings.copy_from_slice(&self.analog[..FLOOR_SENSOR_CHANNELS]);
        readings
    }
}

/// One robot slot shared between its register server and the simulation loop.
pub type SharedRobot = Arc<Mutex<RobotState>>;

pub fn shared(slot: usize) -> SharedRobot {
    Arc::new(Mutex::new(RobotState::new(slot)))
}

/// Lock a robot slot. Every writer applies whole requests under the lock,
/// so state left behind by a panicking holder is still consistent.
pub fn lock(robot: &SharedRobot) -> MutexGuard<'_, RobotState> {
    robot.lock().unwrap_or_else(PoisonError::into_inner)
}
