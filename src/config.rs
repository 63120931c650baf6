//! Configuration constants for the sumo arena simulator.

use std::time::Duration;

// Arena geometry
pub const ARENA_HALF_EXTENT: f64 = 0.7; // Floor spans [-0.7, 0.7] on both axes
pub const ARENA_EXTENT: f64 = 2.0 * ARENA_HALF_EXTENT;

// Robot body (metres)
pub const ROBOT_WIDTH: f64 = 0.16;
pub const ROBOT_LENGTH: f64 = 0.20;
pub const ROBOT_HEIGHT: f64 = 0.10;
pub const ROBOT_SLOTS: usize = 2;

// Register file
pub const PWM_VELOCITY_DIVISOR: f64 = 1000.0; // PWM 255 -> 0.255 units/s
pub const DEFAULT_PWM: u8 = 255;
pub const ANALOG_CHANNELS: usize = 8;
pub const FLOOR_SENSOR_CHANNELS: usize = 4;
pub const MAX_NAME_LEN: usize = 20;

// Network
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_BASE_PORT: u16 = 4009; // Robot 1 listens on DEFAULT_BASE_PORT + 1
pub const MAX_REQUEST_LEN: usize = 128; // Bytes per request line, newline excluded
pub const CLIENT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

// Rendering configuration
pub const WINDOW_WIDTH: i32 = 760;
pub const WINDOW_HEIGHT: i32 = 640;
pub const STATUS_BAR_HEIGHT: i32 = 100;
pub const ARENA_VIEW_SIZE: i32 = WINDOW_HEIGHT - STATUS_BAR_HEIGHT;
