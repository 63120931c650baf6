use log::warn;
use macroquad::prelude::*;
use sumosim::config::{ARENA_EXTENT, ARENA_HALF_EXTENT, ARENA_VIEW_SIZE, STATUS_BAR_HEIGHT};
use sumosim::floor::FloorMap;
use sumosim::robot::RobotState;
use sumosim::sensors;

const ROBOT_COLORS: [Color; 2] = [RED, BLUE];
const FONT_SIZE: f32 = 20.0;

// Top-down view of the arena floor, both robots and a status bar
pub struct Renderer {
    floor_texture: Option<Texture2D>,
    listen_text: String,
}

impl Renderer {
    pub fn new(floor: &FloorMap, listen_text: String) -> Self {
        Renderer {
            floor_texture: Self::floor_texture(floor),
            listen_text,
        }
    }

    fn floor_texture(floor: &FloorMap) -> Option<Texture2D> {
        let (Ok(width), Ok(height)) = (u16::try_from(floor.width()), u16::try_from(floor.height()))
        else {
            warn!("Floor image too large to display");
            return None;
        };
        // Textures are stored top row first, the floor map bottom row first
        let mut rgba = Vec::with_capacity(floor.width() * floor.height() * 4);
        for row in (0..floor.height()).rev() {
            for column in 0..floor.width() {
                let [r, g, b] = floor.rgb(column, row);
                rgba.extend_from_slice(&[r, g, b, 255]);
            }
        }
        let texture = Texture2D::from_rgba8(width, height, &rgba);
        texture.set_filter(FilterMode::Nearest);
        Some(texture)
    }

    fn view_origin() -> Vec2 {
        vec2(
            (screen_width() - ARENA_VIEW_SIZE as f32) / 2.0,
            0.0,
        )
    }

    fn scale() -> f32 {
        ARENA_VIEW_SIZE as f32 / ARENA_EXTENT as f32
    }

    fn world_to_screen(x: f64, y: f64) -> Vec2 {
        let origin = Self::view_origin();
        vec2(
            origin.x + ((x + ARENA_HALF_EXTENT) as f32) * Self::scale(),
            origin.y + ((ARENA_HALF_EXTENT - y) as f32) * Self::scale(),
        )
    }

    pub fn draw_frame(&self, robots: &[RobotState]) {
        clear_background(Color::from_rgba(0, 150, 0, 255));
        self.draw_floor();
        for robot in robots {
            Self::draw_robot(robot);
        }
        self.draw_status_bar(robots);
    }

    fn draw_floor(&self) {
        let origin = Self::view_origin();
        let size = ARENA_VIEW_SIZE as f32;
        match &self.floor_texture {
            Some(texture) => draw_texture_ex(
                texture,
                origin.x,
                origin.y,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(size, size)),
                    ..Default::default()
                },
            ),
            None => draw_rectangle(origin.x, origin.y, size, size, GRAY),
        }
    }

    fn draw_robot(robot: &RobotState) {
        let color = ROBOT_COLORS[robot.slot % ROBOT_COLORS.len()];
        let center = Self::world_to_screen(robot.x, robot.y);
        let scale = Self::scale();

        // Screen y points down, so a counter-clockwise world heading is a
        // clockwise screen rotation
        draw_rectangle_ex(
            center.x,
            center.y,
            robot.length as f32 * scale,
            robot.width as f32 * scale,
            DrawRectangleParams {
                offset: vec2(0.5, 0.5),
                rotation: -robot.angle as f32,
                color,
            },
        );

        let (sin, cos) = robot.angle.sin_cos();
        let nose = Self::world_to_screen(
            robot.x + 0.35 * robot.length * cos,
            robot.y + 0.35 * robot.length * sin,
        );
        draw_circle(nose.x, nose.y, robot.width as f32 * scale * 0.15, WHITE);

        for (point, reading) in sensors::sensor_points(robot)
            .iter()
            .zip(robot.floor_sensors())
        {
            let p = Self::world_to_screen(point.x, point.y);
            draw_circle(p.x, p.y, 3.0, Color::from_rgba(reading, reading, reading, 255));
            draw_circle_lines(p.x, p.y, 3.0, 1.0, YELLOW);
        }
    }

    fn draw_status_bar(&self, robots: &[RobotState]) {
        let top = screen_height() - STATUS_BAR_HEIGHT as f32;
        draw_rectangle(0.0, top, screen_width(), STATUS_BAR_HEIGHT as f32, Color::from_rgba(20, 20, 50, 255));

        let mut y = top + FONT_SIZE;
        draw_text(&self.listen_text, 10.0, y, FONT_SIZE, WHITE);
        for robot in robots {
            y += FONT_SIZE;
            let name = if robot.name.is_empty() { "-" } else { robot.name.as_str() };
            let status = if robot.active { "connected" } else { "waiting" };
            let [fl, fr, bl, br] = robot.floor_sensors();
            let line = format!(
                "Robot {} {:<20} {:<9} latch {:04b} pwm {:3}/{:3} AN {:3} {:3} {:3} {:3}",
                robot.slot,
                name,
                status,
                robot.latch.bits(),
                robot.pwm_left,
                robot.pwm_right,
                fl,
                fr,
                bl,
                br
            );
            draw_text(&line, 10.0, y, FONT_SIZE, ROBOT_COLORS[robot.slot % ROBOT_COLORS.len()]);
        }
        y += FONT_SIZE;
        draw_text("Q quit   SPACE reset robots", 10.0, y, FONT_SIZE, LIGHTGRAY);
    }
}
