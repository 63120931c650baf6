//! Two-contact-point pose integration.
//!
//! Each wheel's ground contact point sits half the body width from the
//! centre, perpendicular to the heading. Both points are pushed along the
//! current heading by their wheel's travel for the tick; the new centre is
//! their midpoint and the new heading is perpendicular to the line joining
//! them. This is a first-order step, accurate for small `tau`, and large
//! angular steps can make the heading jump.

use crate::robot::RobotState;
use crate::types::Point;
use std::f64::consts::{FRAC_PI_2, PI};

/// Wheel contact points after travelling for `tau` seconds.
///
/// The first point carries the right-motor channel (latch bits 0/1,
/// `pwm_right`) and sits on the +normal side of the heading; the second
/// carries the left-motor channel on the -normal side. Client programs are
/// written against this wiring.
pub fn contact_points(robot: &RobotState, tau: f64) -> (Point, Point) {
    let (sin, cos) = robot.angle.sin_cos();
    let half_width = robot.width / 2.0;
    let first = Point {
        x: robot.x - half_width * sin + tau * robot.right_wheel_velocity * cos,
        y: robot.y + half_width * cos + tau * robot.right_wheel_velocity * sin,
    };
    let second = Point {
        x: robot.x + half_width * sin + tau * robot.left_wheel_velocity * cos,
        y: robot.y - half_width * cos + tau * robot.left_wheel_velocity * sin,
    };
    (first, second)
}

/// Heading implied by the two contact points.
pub fn heading_from_points(first: Point, second: Point) -> f64 {
    if second.x == first.x {
        // Joining line is vertical, atan2 is not used here
        if second.y < first.y { 0.0 } else { PI }
    } else {
        FRAC_PI_2 + (second.y - first.y).atan2(second.x - first.x)
    }
}

/// Advance the robot's pose by `tau` seconds using its current registers.
///
/// A negative or non-finite `tau` (a clock that stepped backwards) is
/// treated as zero. The pose only changes when the result is finite.
pub fn integrate(robot: &mut RobotState, tau: f64) {
    let tau = if tau.is_finite() && tau > 0.0 { tau } else { 0.0 };

    robot.update_wheel_velocities();
    if tau == 0.0 {
        return;
    }

    let (first, second) = contact_points(robot, tau);
    let center = first.midpoint(second);
    let angle = heading_from_points(first, second);

    if center.x.is_finite() && center.y.is_finite() && angle.is_finite() {
        robot.x = center.x;
        robot.y = center.y;
        robot.angle = angle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::DigitalLatch;
    use assert_approx_eq::assert_approx_eq;

    fn robot_at(x: f64, y: f64, angle: f64, latch: u8, pwm_left: u8, pwm_right: u8) -> RobotState {
        let mut robot = RobotState::new(0);
        robot.x = x;
        robot.y = y;
        robot.angle = angle;
        robot.latch = DigitalLatch::from_bits_truncate(latch);
        robot.pwm_left = pwm_left;
        robot.pwm_right = pwm_right;
        robot
    }

    fn same_heading(a: f64, b: f64) -> bool {
        let diff = (a - b).rem_euclid(2.0 * PI);
        diff < 1e-9 || (2.0 * PI - diff) < 1e-9
    }

    #[test]
    fn test_zero_tau_keeps_pose() {
        let mut robot = robot_at(0.1, -0.2, 0.7, 0b1010, 200, 200);
        integrate(&mut robot, 0.0);
        assert_eq!((robot.x, robot.y, robot.angle), (0.1, -0.2, 0.7));
    }

    #[test]
    fn test_backward_clock_is_ignored() {
        let mut robot = robot_at(0.0, 0.0, 0.0, 0b1010, 255, 255);
        integrate(&mut robot, -1.0);
        integrate(&mut robot, f64::NAN);
        assert_eq!((robot.x, robot.y, robot.angle), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_stationary_step_preserves_heading() {
        for angle in [0.0, 0.5, 1.5, 3.0, -2.0, -PI] {
            let mut robot = robot_at(0.2, 0.3, angle, 0, 255, 255);
            integrate(&mut robot, 0.5);
            assert_approx_eq!(robot.x, 0.2);
            assert_approx_eq!(robot.y, 0.3);
            assert!(same_heading(robot.angle, angle), "{} vs {}", robot.angle, angle);
        }
    }

    #[test]
    fn test_straight_line_forward() {
        let mut robot = robot_at(0.0, 0.0, 0.0, 0b1010, 100, 100);
        integrate(&mut robot, 2.0);
        assert_approx_eq!(robot.x, 0.2);
        assert_approx_eq!(robot.y, 0.0);
        assert_eq!(robot.angle, 0.0);
    }

    #[test]
    fn test_straight_line_along_heading() {
        let heading = PI / 3.0;
        let mut robot = robot_at(0.0, 0.0, heading, 0b1010, 255, 255);
        integrate(&mut robot, 1.0);
        assert_approx_eq!(robot.x, 0.255 * heading.cos());
        assert_approx_eq!(robot.y, 0.255 * heading.sin());
        assert!(same_heading(robot.angle, heading));
    }

    #[test]
    fn test_right_channel_only_turns() {
        let mut robot = robot_at(0.0, 0.0, 0.0, DigitalLatch::RIGHT_FORWARD, 255, 255);
        integrate(&mut robot, 1.0);
        // Centre advances by half the driven wheel's travel
        assert_approx_eq!(robot.x, 0.1275);
        assert_approx_eq!(robot.y, 0.0);
        // Heading rotates clockwise: atan(0.255 / 0.16)
        assert_approx_eq!(robot.angle, -(0.255f64 / 0.16).atan());
    }

    #[test]
    fn test_coincident_points_stay_finite() {
        let mut robot = robot_at(0.0, 0.0, 0.0, 0, 255, 255);
        robot.width = 0.0;
        integrate(&mut robot, 1.0);
        assert!(robot.angle.is_finite());
        assert_eq!(robot.angle, PI);
    }

    #[test]
    fn test_vertical_joining_line() {
        let first = Point::new(0.0, 0.08);
        let second = Point::new(0.0, -0.08);
        assert_eq!(heading_from_points(first, second), 0.0);
        assert_eq!(heading_from_points(second, first), PI);
    }

    #[test]
    fn test_heading_never_nan() {
        for i in 0..64 {
            let angle = i as f64 * 0.1 - 3.2;
            for latch in 0..=DigitalLatch::MASK {
                let mut robot = robot_at(0.1, 0.1, angle, latch, 255, 17);
                integrate(&mut robot, 0.03);
                assert!(robot.angle.is_finite());
                assert!(robot.x.is_finite() && robot.y.is_finite());
            }
        }
    }
}
