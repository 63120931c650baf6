use crate::config::FLOOR_SENSOR_CHANNELS;
use crate::floor::FloorMap;
use crate::robot::RobotState;
use crate::types::Point;

/// Floor sensor positions in arena coordinates, in analog channel order:
/// front-left, front-right, back-left, back-right.
pub fn sensor_points(robot: &RobotState) -> [Point; FLOOR_SENSOR_CHANNELS] {
    let (sin, cos) = robot.angle.sin_cos();
    // Centre to the middle of the right side
    let side_x = (robot.width / 2.0) * sin;
    let side_y = -(robot.width / 2.0) * cos;
    // Centre to the middle of the front edge
    let front_x = (robot.length / 2.0) * cos;
    let front_y = (robot.length / 2.0) * sin;

    [
        Point::new(robot.x - side_x + front_x, robot.y - side_y + front_y),
        Point::new(robot.x + side_x + front_x, robot.y + side_y + front_y),
        Point::new(robot.x - side_x - front_x, robot.y - side_y - front_y),
        Point::new(robot.x + side_x - front_x, robot.y + side_y - front_y),
    ]
}

/// Sample the floor under the four corner sensors into analog channels 0..3.
pub fn sense(robot: &mut RobotState, floor: &FloorMap) {
    let points = sensor_points(robot);
    for (channel, point) in points.iter().enumerate() {
        robot.analog[channel] = floor.intensity_at(point.x, point.y);
    }
    crate::debug_sensor!(robot: robot.slot, "Floor sensors {:?}", robot.floor_sensors());
}
