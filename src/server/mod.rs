// Network register server entry point

pub mod listener;
pub mod protocol;

pub use listener::{RegisterServer, ServerHandle};
pub use protocol::{Request, Response};

use crate::config::{ROBOT_SLOTS, SHUTDOWN_GRACE};
use crate::simulation::Simulation;
use log::warn;
use std::io;
use std::net::IpAddr;

/// Start one register server per robot slot on consecutive ports
/// beginning at `base_port`.
pub fn start_all(simulation: &Simulation, bind: IpAddr, base_port: u16) -> io::Result<Vec<ServerHandle>> {
    let mut handles = Vec::with_capacity(ROBOT_SLOTS);
    for slot in 0..ROBOT_SLOTS {
        let port = if base_port == 0 {
            0
        } else {
            base_port.checked_add(slot as u16).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "port range overflows u16")
            })?
        };
        let server = RegisterServer::bind(
            (bind, port),
            slot,
            simulation.robot(slot),
            simulation.shutdown_flag(),
        )?;
        handles.push(server.spawn()?);
    }
    Ok(handles)
}

/// Stop every server and wait a bounded time for each thread to exit
pub fn stop_all(handles: Vec<ServerHandle>) {
    for handle in &handles {
        handle.stop();
    }
    for handle in handles {
        let slot = handle.slot();
        if !handle.join_timeout(SHUTDOWN_GRACE) {
            warn!("Robot {} register server abandoned", slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaConfig;
    use crate::floor::FloorMap;
    use crate::robot;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{Ipv4Addr, TcpStream};
    use std::thread;
    use std::time::{Duration, Instant};

    fn request(reader: &mut BufReader<TcpStream>, writer: &mut TcpStream, line: &str) -> String {
        writeln!(writer, "{}", line).unwrap();
        let mut response = String::new();
        reader.read_line(&mut response).unwrap();
        response.trim_end().to_string()
    }

    #[test]
    fn test_client_drives_robot_through_simulation() {
        let floor = FloorMap::uniform(16, 16, [200, 200, 200]).unwrap();
        let arena = ArenaConfig::parse(
            "ROBOT_0_X 0 ROBOT_0_Y 0 ROBOT_0_ANGLE 0 ROBOT_1_X 0.3 ROBOT_1_Y 0 ROBOT_1_ANGLE 0 END",
        )
        .unwrap();
        let mut sim = Simulation::new(floor, arena, &mut StdRng::seed_from_u64(5));
        let handles = start_all(&sim, IpAddr::V4(Ipv4Addr::LOCALHOST), 0).unwrap();
        assert_eq!(handles.len(), ROBOT_SLOTS);

        let mut writer = TcpStream::connect(handles[0].local_addr()).unwrap();
        writer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut reader = BufReader::new(writer.try_clone().unwrap());

        assert_eq!(request(&mut reader, &mut writer, "PWM 255 255"), "OK");
        assert_eq!(request(&mut reader, &mut writer, "LATCH 0b0010"), "OK");
        assert_eq!(request(&mut reader, &mut writer, "READ"), "AN 200 200 200 200");

        let shared = sim.robot(0);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !robot::lock(&shared).active && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        sim.step(1.0);

        let [r0, r1] = sim.snapshots();
        // Only the right channel drives: the robot swings clockwise while advancing
        assert_approx_eq!(r0.x, 0.1275);
        assert!(r0.angle < 0.0);
        assert_eq!((r1.x, r1.angle), (0.3, 0.0));
        assert!(request(&mut reader, &mut writer, "POSE").starts_with("POSE 0.1275 "));

        sim.request_quit();
        stop_all(handles);
    }
}
