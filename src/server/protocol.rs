//! Line-oriented register protocol.
//!
//! Every request is one ASCII line; every request gets exactly one response
//! line. Keywords are case-insensitive and numbers may be written in
//! decimal, `0x` hex or `0b` binary.
//!
//! ```text
//! LATCH <0..15>          -> OK
//! PWM <left> <right>     -> OK
//! PWML <0..255>          -> OK
//! PWMR <0..255>          -> OK
//! READ                   -> AN <fl> <fr> <bl> <br>
//! READ <0..7>            -> AN <value>
//! NAME <text>            -> OK
//! POSE                   -> POSE <x> <y> <angle>
//! BYE                    -> BYE
//! ```
//!
//! A request is fully parsed and validated before the robot is touched, and
//! is then applied under a single lock, so a client never leaves a
//! half-written register set behind.

use crate::config::{ANALOG_CHANNELS, FLOOR_SENSOR_CHANNELS, MAX_NAME_LEN};
use crate::error::ProtocolError;
use crate::robot::{DigitalLatch, RobotState};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    SetLatch(u8),
    SetPwm { left: Option<u8>, right: Option<u8> },
    ReadSensors,
    ReadChannel(usize),
    SetName(String),
    ReadPose,
    Bye,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok,
    Sensors([u8; FLOOR_SENSOR_CHANNELS]),
    Channel(u8),
    Pose { x: f64, y: f64, angle: f64 },
    Bye,
    Error(ProtocolError),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Sensors([fl, fr, bl, br]) => write!(f, "AN {} {} {} {}", fl, fr, bl, br),
            Response::Channel(value) => write!(f, "AN {}", value),
            Response::Pose { x, y, angle } => write!(f, "POSE {:.4} {:.4} {:.4}", x, y, angle),
            Response::Bye => write!(f, "BYE"),
            Response::Error(e) => write!(f, "ERR {}", e),
        }
    }
}

/// Parse an unsigned register value and check it against `max`.
fn parse_value(token: &str, what: &'static str, max: u64) -> Result<u64, ProtocolError> {
    let lower = token.to_ascii_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        lower.parse::<u64>()
    };
    let value = parsed.map_err(|_| ProtocolError::InvalidNumber(token.to_string()))?;
    if value > max {
        return Err(ProtocolError::OutOfRange { what, value, max });
    }
    Ok(value)
}

fn parse_pwm(token: &str) -> Result<u8, ProtocolError> {
    parse_value(token, "pwm", u8::MAX as u64).map(|v| v as u8)
}

fn parse_name(rest: &str) -> Result<String, ProtocolError> {
    let name = rest.trim();
    if name.is_empty() {
        return Err(ProtocolError::MissingArgument("name"));
    }
    if !name.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        return Err(ProtocolError::InvalidName);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ProtocolError::NameTooLong { max: MAX_NAME_LEN });
    }
    Ok(name.to_string())
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();
        let command = command.to_ascii_uppercase();

        let expect_args = |count: usize, missing: &'static str| match args.len() {
            n if n < count => Err(ProtocolError::MissingArgument(missing)),
            n if n > count => Err(ProtocolError::TooManyArguments),
            _ => Ok(()),
        };

        match command.as_str() {
            "LATCH" => {
                expect_args(1, "latch value")?;
                let bits = parse_value(args[0], "latch", DigitalLatch::MASK as u64)?;
                Ok(Request::SetLatch(bits as u8))
            }
            "PWM" => {
                expect_args(2, "left and right duty")?;
                Ok(Request::SetPwm {
                    left: Some(parse_pwm(args[0])?),
                    right: Some(parse_pwm(args[1])?),
                })
            }
            "PWML" => {
                expect_args(1, "left duty")?;
                Ok(Request::SetPwm {
                    left: Some(parse_pwm(args[0])?),
                    right: None,
                })
            }
            "PWMR" => {
                expect_args(1, "right duty")?;
                Ok(Request::SetPwm {
                    left: None,
                    right: Some(parse_pwm(args[0])?),
                })
            }
            "READ" => match args.as_slice() {
                [] => Ok(Request::ReadSensors),
                [channel] => {
                    let channel = parse_value(channel, "channel", (ANALOG_CHANNELS - 1) as u64)?;
                    Ok(Request::ReadChannel(channel as usize))
                }
                _ => Err(ProtocolError::TooManyArguments),
            },
            "NAME" => Ok(Request::SetName(parse_name(rest)?)),
            "POSE" => {
                expect_args(0, "")?;
                Ok(Request::ReadPose)
            }
            "BYE" => {
                expect_args(0, "")?;
                Ok(Request::Bye)
            }
            _ => Err(ProtocolError::UnknownCommand(command)),
        }
    }
}

impl Request {
    /// Apply the request to a locked robot and build the reply.
    pub fn apply(self, robot: &mut RobotState) -> Response {
        match self {
            Request::SetLatch(bits) => {
                robot.latch = DigitalLatch::from_bits_truncate(bits);
                Response::Ok
            }
            Request::SetPwm { left, right } => {
                if let Some(left) = left {
                    robot.pwm_left = left;
                }
                if let Some(right) = right {
                    robot.pwm_right = right;
                }
                Response::Ok
            }
            Request::ReadSensors => Response::Sensors(robot.floor_sensors()),
            Request::ReadChannel(channel) => Response::Channel(robot.analog[channel]),
            Request::SetName(name) => {
                robot.name = name;
                Response::Ok
            }
            Request::ReadPose => Response::Pose {
                x: robot.x,
                y: robot.y,
                angle: robot.angle,
            },
            Request::Bye => Response::Bye,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latch() {
        assert_eq!("LATCH 2".parse::<Request>(), Ok(Request::SetLatch(2)));
        assert_eq!("latch 0b1010".parse::<Request>(), Ok(Request::SetLatch(0b1010)));
        assert_eq!("Latch 0xF\r".parse::<Request>(), Ok(Request::SetLatch(15)));
        assert_eq!(
            "LATCH 16".parse::<Request>(),
            Err(ProtocolError::OutOfRange { what: "latch", value: 16, max: 15 })
        );
        assert_eq!(
            "LATCH -1".parse::<Request>(),
            Err(ProtocolError::InvalidNumber("-1".to_string()))
        );
        assert_eq!(
            "LATCH".parse::<Request>(),
            Err(ProtocolError::MissingArgument("latch value"))
        );
        assert_eq!("LATCH 1 2".parse::<Request>(), Err(ProtocolError::TooManyArguments));
    }

    #[test]
    fn test_parse_pwm() {
        assert_eq!(
            "PWM 100 255".parse::<Request>(),
            Ok(Request::SetPwm { left: Some(100), right: Some(255) })
        );
        assert_eq!(
            "pwmr 0x10".parse::<Request>(),
            Ok(Request::SetPwm { left: None, right: Some(16) })
        );
        assert_eq!(
            "PWM 100 256".parse::<Request>(),
            Err(ProtocolError::OutOfRange { what: "pwm", value: 256, max: 255 })
        );
        assert_eq!(
            "PWML 99999999999999999999999".parse::<Request>(),
            Err(ProtocolError::InvalidNumber("99999999999999999999999".to_string()))
        );
    }

    #[test]
    fn test_parse_read_name_pose() {
        assert_eq!("READ".parse::<Request>(), Ok(Request::ReadSensors));
        assert_eq!("read 7".parse::<Request>(), Ok(Request::ReadChannel(7)));
        assert!(matches!(
            "READ 8".parse::<Request>(),
            Err(ProtocolError::OutOfRange { .. })
        ));
        assert_eq!(
            "NAME  Red Baron ".parse::<Request>(),
            Ok(Request::SetName("Red Baron".to_string()))
        );
        assert_eq!(
            "NAME 123456789012345678901".parse::<Request>(),
            Err(ProtocolError::NameTooLong { max: MAX_NAME_LEN })
        );
        assert_eq!("NAME bad\tname".parse::<Request>(), Err(ProtocolError::InvalidName));
        assert_eq!("POSE".parse::<Request>(), Ok(Request::ReadPose));
        assert_eq!("bye".parse::<Request>(), Ok(Request::Bye));
        assert_eq!(
            "FIRE".parse::<Request>(),
            Err(ProtocolError::UnknownCommand("FIRE".to_string()))
        );
    }

    #[test]
    fn test_apply_writes_registers() {
        let mut robot = RobotState::new(0);
        assert_eq!(Request::SetLatch(0b0010).apply(&mut robot), Response::Ok);
        assert_eq!(robot.latch.bits(), 0b0010);

        let pwm = Request::SetPwm { left: Some(10), right: None };
        assert_eq!(pwm.apply(&mut robot), Response::Ok);
        assert_eq!((robot.pwm_left, robot.pwm_right), (10, 255));

        robot.analog = [1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(Request::ReadSensors.apply(&mut robot), Response::Sensors([1, 2, 3, 4]));
        assert_eq!(Request::ReadChannel(6).apply(&mut robot), Response::Channel(7));
    }

    #[test]
    fn test_response_format() {
        assert_eq!(Response::Sensors([255, 0, 12, 3]).to_string(), "AN 255 0 12 3");
        assert_eq!(
            Response::Pose { x: 0.1, y: -0.25, angle: 3.0 }.to_string(),
            "POSE 0.1000 -0.2500 3.0000"
        );
        assert_eq!(
            Response::Error(ProtocolError::UnknownCommand("X".to_string())).to_string(),
            "ERR unknown command 'X'"
        );
    }
}
