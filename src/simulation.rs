use crate::arena::ArenaConfig;
use crate::config::ROBOT_SLOTS;
use crate::floor::FloorMap;
use crate::kinematics;
use crate::robot::{self, RobotState, SharedRobot};
use crate::sensors;
use crate::types::LoopState;
use log::info;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// The Simulation owns both robot slots and drives physics and sensing
pub struct Simulation {
    robots: [SharedRobot; ROBOT_SLOTS],
    floor: Arc<FloorMap>,
    arena: ArenaConfig,
    state: LoopState,
    shutdown: Arc<AtomicBool>,
    last_tick: Instant,
    tick_count: u64,
}

impl Simulation {
    /// Create both robot slots and place them according to the arena config
    pub fn new<R: Rng>(floor: FloorMap, arena: ArenaConfig, rng: &mut R) -> Self {
        let mut simulation = Simulation {
            robots: std::array::from_fn(robot::shared),
            floor: Arc::new(floor),
            arena,
            state: LoopState::Running,
            shutdown: Arc::new(AtomicBool::new(false)),
            last_tick: Instant::now(),
            tick_count: 0,
        };
        simulation.reset(rng);
        simulation
    }

    /// Shared handle to one robot slot, for its register server
    pub fn robot(&self, slot: usize) -> SharedRobot {
        Arc::clone(&self.robots[slot])
    }

    pub fn floor(&self) -> &FloorMap {
        &self.floor
    }

    /// Flag raised when the loop starts shutting down; register servers poll it
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Consistent copies of both robots, each taken under its own lock
    pub fn snapshots(&self) -> [RobotState; ROBOT_SLOTS] {
        std::array::from_fn(|slot| robot::lock(&self.robots[slot]).clone())
    }

    /// Put both robots back at their starting poses with fresh registers
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        for (slot, shared) in self.robots.iter().enumerate() {
            let start = self.arena.start[slot];
            let angle = start.angle + self.arena.random_angle_offset(rng);
            let mut robot = robot::lock(shared);
            robot.reinitialize(start.x, start.y, angle);
            sensors::sense(&mut robot, &self.floor);
            info!(
                "Robot {} placed at ({:.3}, {:.3}) heading {:.3} rad",
                slot, robot.x, robot.y, robot.angle
            );
        }
        self.last_tick = Instant::now();
    }

    /// Advance by the wall-clock time elapsed since the previous tick.
    /// Returns the step length in seconds.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let tau = now.saturating_duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        self.step(tau);
        tau
    }

    /// Advance every active robot by `tau` seconds and refresh its sensors
    pub fn step(&mut self, tau: f64) {
        if !self.is_running() {
            return;
        }
        for shared in &self.robots {
            let mut robot = robot::lock(shared);
            if !robot.active {
                continue;
            }
            kinematics::integrate(&mut robot, tau);
            sensors::sense(&mut robot, &self.floor);
            crate::debug_sim!(
                robot: robot.slot,
                "Tick {} tau {:.4}s pose ({:.4}, {:.4}, {:.4})",
                self.tick_count,
                tau,
                robot.x,
                robot.y,
                robot.angle
            );
        }
        self.tick_count += 1;
    }

    /// Stop ticking and ask every register server to close
    pub fn request_quit(&mut self) {
        if self.state == LoopState::ShuttingDown {
            return;
        }
        info!("Quit requested, shutting down after {} ticks", self.tick_count);
        self.state = LoopState::ShuttingDown;
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
