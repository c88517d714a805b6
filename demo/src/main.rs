//! Headful demo composing the two devices: arrow keys move a square, the
//! camera follows it, space toggles pause, shift boosts.

use std::error::Error;

use glam::Vec2;
use winit::dpi::PhysicalSize;

use devices::app::{self, AppConfig};
use devices::canvas::{Canvas2d, Color, Rect, RgbaCanvas, SurfaceSize};
use devices::keyboard::{Bindings, KeyboardDevice};
use devices::viewport::{ViewportConfig, ViewportDevice};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

const COLOR_BACKGROUND: Color = [10, 10, 14, 255];
const COLOR_GRID_DOT: Color = [24, 24, 32, 255];
const COLOR_PLAYER: Color = [0, 229, 255, 255];
const COLOR_PLAYER_PAUSED: Color = [120, 120, 130, 255];

const PLAYER_SIZE: f32 = 16.0;
const GRID_STEP: f32 = 64.0;

const BINDINGS_JSON: &str = r#"{
  "left": 37,
  "up": 38,
  "right": 39,
  "down": 40,
  "pause": 32,
  "boost": "shift"
}"#;

struct World {
    player: Vec2,
    paused: bool,
}

fn draw_world(ctx: &mut RgbaCanvas, camera: &devices::viewport::Camera, world: &World) {
    ctx.fill_rect(Rect::from_size(ctx.size()), COLOR_BACKGROUND);

    // Grid dots anchored to world space reveal the camera motion.
    let mut x = (camera.pos.x / GRID_STEP).floor() * GRID_STEP;
    while x < camera.pos.x + camera.size.x {
        let mut y = (camera.pos.y / GRID_STEP).floor() * GRID_STEP;
        while y < camera.pos.y + camera.size.y {
            ctx.fill_rect(
                Rect::new(x - camera.pos.x, y - camera.pos.y, 2.0, 2.0),
                COLOR_GRID_DOT,
            );
            y += GRID_STEP;
        }
        x += GRID_STEP;
    }

    let local = world.player - camera.pos;
    let color = if world.paused {
        COLOR_PLAYER_PAUSED
    } else {
        COLOR_PLAYER
    };
    ctx.fill_rect(
        Rect::new(
            local.x - PLAYER_SIZE / 2.0,
            local.y - PLAYER_SIZE / 2.0,
            PLAYER_SIZE,
            PLAYER_SIZE,
        ),
        color,
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let keyboard = KeyboardDevice::new(Bindings::from_json(BINDINGS_JSON)?);

    let canvas = RgbaCanvas::new(SurfaceSize::new(WIDTH, HEIGHT));
    let mut viewport: ViewportDevice<RgbaCanvas, World> =
        ViewportDevice::new(canvas, WIDTH, HEIGHT, ViewportConfig::from_env());
    viewport.set_world(World {
        player: Vec2::ZERO,
        paused: false,
    });
    viewport.set_camera_pos(Vec2::ZERO);

    viewport.set_on_draw(|ctx, camera, world| {
        if let Some(world) = world {
            draw_world(ctx, camera, world);
        }
        Ok(())
    });

    app::run(
        AppConfig {
            title: "drift demo".to_string(),
            desired_size: PhysicalSize::new(WIDTH, HEIGHT),
        },
        keyboard,
        viewport,
        |keyboard, viewport| {
            if keyboard.toggle("pause") {
                if let Some(world) = viewport.world_mut() {
                    world.paused = !world.paused;
                    log::info!("paused: {}", world.paused);
                }
            }

            let mut step = Vec2::ZERO;
            if keyboard.on("left") {
                step.x -= 1.0;
            }
            if keyboard.on("right") {
                step.x += 1.0;
            }
            if keyboard.on("up") {
                step.y -= 1.0;
            }
            if keyboard.on("down") {
                step.y += 1.0;
            }
            let speed = if keyboard.on("boost") { 6.0 } else { 3.0 };

            let focus = {
                let Some(world) = viewport.world_mut() else { return };
                if !world.paused && step != Vec2::ZERO {
                    world.player += step.normalize() * speed;
                }
                world.player
            };
            viewport.set_camera_pos(focus);
        },
    )
}
