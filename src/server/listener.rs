//! Per-slot TCP register server.
//!
//! Each robot slot gets its own listener thread. The thread serves one
//! client at a time; anyone else who connects while the slot is taken is
//! told so and disconnected. All socket waits are bounded by
//! `CLIENT_POLL_INTERVAL` so the shutdown flag is noticed promptly.

use super::protocol::{Request, Response};
use crate::config::{CLIENT_POLL_INTERVAL, MAX_REQUEST_LEN};
use crate::error::ProtocolError;
use crate::robot::{self, SharedRobot};
use log::{error, info, warn};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Socket of the currently connected client, shared so shutdown can break
/// a blocked read from outside the server thread.
type ActiveClient = Arc<Mutex<Option<TcpStream>>>;

/// Why a client session ended
#[derive(Debug)]
enum SessionEnd {
    ClientClosed,
    Goodbye,
    Shutdown,
    Protocol(ProtocolError),
    Io(io::Error),
}

/// Register server bound to one robot slot
pub struct RegisterServer {
    slot: usize,
    robot: SharedRobot,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    client: ActiveClient,
}

impl RegisterServer {
    /// Bind the slot's listener. Port 0 picks an ephemeral port.
    pub fn bind<A: ToSocketAddrs>(
        address: A,
        slot: usize,
        robot: SharedRobot,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        Ok(RegisterServer {
            slot,
            robot,
            listener,
            shutdown,
            client: Arc::new(Mutex::new(None)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop on a dedicated named thread
    pub fn spawn(self) -> io::Result<ServerHandle> {
        let address = self.local_addr()?;
        let slot = self.slot;
        let shutdown = Arc::clone(&self.shutdown);
        let client = Arc::clone(&self.client);
        let thread = thread::Builder::new()
            .name(format!("register-server-{}", slot))
            .spawn(move || self.run())?;
        info!("Robot {} register server listening on {}", slot, address);
        Ok(ServerHandle {
            slot,
            address,
            thread,
            shutdown,
            client,
        })
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn run(self) {
        while !self.is_shutting_down() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.serve(stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(CLIENT_POLL_INTERVAL);
                }
                Err(e) => {
                    error!("Robot {} accept failed: {}", self.slot, e);
                    thread::sleep(CLIENT_POLL_INTERVAL);
                }
            }
        }
        info!("Robot {} register server stopped", self.slot);
    }

    /// Serve one client until it leaves, then release the slot
    fn serve(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = Self::configure(&stream) {
            warn!("Robot {} could not configure client {}: {}", self.slot, peer, e);
            return;
        }
        if let Ok(handle) = stream.try_clone() {
            *self.client.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }

        robot::lock(&self.robot).active = true;
        info!("Robot {} client connected from {}", self.slot, peer);

        let end = self.session(stream);

        {
            let mut robot = robot::lock(&self.robot);
            robot.active = false;
            robot.latch = Default::default();
            robot.update_wheel_velocities();
            robot.name.clear();
        }
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match end {
            SessionEnd::ClientClosed | SessionEnd::Goodbye => {
                info!("Robot {} client {} disconnected", self.slot, peer)
            }
            SessionEnd::Shutdown => info!("Robot {} client {} closed for shutdown", self.slot, peer),
            SessionEnd::Protocol(e) => {
                warn!("Robot {} dropping client {}: {}", self.slot, peer, e)
            }
            SessionEnd::Io(e) => warn!("Robot {} client {} lost: {}", self.slot, peer, e),
        }
    }

    fn configure(stream: &TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(CLIENT_POLL_INTERVAL))?;
        stream.set_write_timeout(Some(CLIENT_POLL_INTERVAL * 10))?;
        stream.set_nodelay(true)
    }

    fn session(&self, mut stream: TcpStream) -> SessionEnd {
        let mut pending: Vec<u8> = Vec::with_capacity(MAX_REQUEST_LEN);
        let mut chunk = [0u8; 64];

        loop {
            if self.is_shutting_down() {
                let _ = stream.shutdown(Shutdown::Both);
                return SessionEnd::Shutdown;
            }
            self.turn_away_extra_clients();

            match stream.read(&mut chunk) {
                Ok(0) => return SessionEnd::ClientClosed,
                Ok(n) => pending.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
                Err(e) if matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::UnexpectedEof
                ) =>
                {
                    return SessionEnd::ClientClosed;
                }
                Err(e) => return SessionEnd::Io(e),
            }

            while let Some(newline) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=newline).collect();
                let Some(response) = self.handle_line(&line[..line.len() - 1]) else {
                    continue;
                };
                if let Err(e) = writeln!(stream, "{}", response) {
                    return SessionEnd::Io(e);
                }
                match response {
                    Response::Bye => {
                        let _ = stream.shutdown(Shutdown::Both);
                        return SessionEnd::Goodbye;
                    }
                    Response::Error(e) if e.is_fatal() => {
                        let _ = stream.shutdown(Shutdown::Both);
                        return SessionEnd::Protocol(e);
                    }
                    _ => {}
                }
            }

            // One extra byte is allowed for the CR of a CRLF terminator
            let overlong = pending.len() > MAX_REQUEST_LEN + 1
                || (pending.len() > MAX_REQUEST_LEN && pending.last() != Some(&b'\r'));
            if overlong {
                let fatal = ProtocolError::LineTooLong(MAX_REQUEST_LEN);
                let _ = writeln!(stream, "{}", Response::Error(fatal.clone()));
                let _ = stream.shutdown(Shutdown::Both);
                return SessionEnd::Protocol(fatal);
            }
        }
    }

    /// Parse and apply one request line. Blank lines get no reply.
    fn handle_line(&self, raw: &[u8]) -> Option<Response> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.len() > MAX_REQUEST_LEN {
            return Some(Response::Error(ProtocolError::LineTooLong(MAX_REQUEST_LEN)));
        }
        let Ok(line) = std::str::from_utf8(raw) else {
            return Some(Response::Error(ProtocolError::InvalidUtf8));
        };
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        crate::debug_net!(robot: self.slot, "Request: {}", line);
        let response = match line.parse::<Request>() {
            Ok(request) => request.apply(&mut robot::lock(&self.robot)),
            Err(e) => Response::Error(e),
        };
        crate::debug_net!(robot: self.slot, "Response: {}", response);
        Some(response)
    }

    /// Accept and immediately refuse anyone queued on a busy slot
    fn turn_away_extra_clients(&self) {
        while let Ok((mut stream, peer)) = self.listener.accept() {
            warn!("Robot {} is busy, refusing {}", self.slot, peer);
            let _ = stream.set_nonblocking(false);
            let _ = stream.set_write_timeout(Some(CLIENT_POLL_INTERVAL));
            let _ = writeln!(stream, "ERR robot slot busy");
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Control handle for a running register server thread
pub struct ServerHandle {
    slot: usize,
    address: SocketAddr,
    thread: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
    client: ActiveClient,
}

impl ServerHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Raise the shutdown flag and break any blocked client read
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(stream) = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Wait up to `timeout` for the thread to exit. A thread that misses the
    /// deadline is detached and `false` is returned.
    pub fn join_timeout(self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.thread.is_finished() {
            if Instant::now() >= deadline {
                warn!("Robot {} register server did not stop in time", self.slot);
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        if self.thread.join().is_err() {
            error!("Robot {} register server panicked", self.slot);
        }
        true
    }
}
