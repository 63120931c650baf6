//! Two-robot sumo arena simulator driven over the network through an
//! emulated microcontroller register file.

pub mod arena;
pub mod assets;
pub mod config;
pub mod error;
pub mod floor;
pub mod kinematics;
pub mod logging;
pub mod robot;
pub mod sensors;
pub mod server;
pub mod simulation;
pub mod types;

pub use arena::ArenaConfig;
pub use error::{ConfigError, FloorError, ProtocolError, SimError};
pub use floor::FloorMap;
pub use robot::{DigitalLatch, RobotState, SharedRobot};
pub use simulation::Simulation;
