//! The viewport device: camera, draw callback, and the refresh loop.

use std::error::Error;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;
use serde::Deserialize;

use crate::canvas::{Canvas2d, Rect, SurfaceSize};
use crate::pacing::FramePacer;

/// Error type at the draw-callback seam.
pub type DrawError = Box<dyn Error + Send + Sync>;

type DrawFn<C, W> = Box<dyn FnMut(&mut C, &Camera, Option<&W>) -> Result<(), DrawError>>;

/// Host tick granularity for the blocking `run` loop.
const TICK_INTERVAL: Duration = Duration::from_millis(1);

/// What `refresh` does with an error returned by the draw callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawPolicy {
    /// Propagate the error and clear the autorefresh flag, stopping the loop.
    Stop,
    /// Log the error and keep ticking.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Frames-per-second ceiling for the skip controller.
    pub max_fps: f32,
    pub on_draw_error: DrawPolicy,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            max_fps: 60.0,
            on_draw_error: DrawPolicy::Stop,
        }
    }
}

impl ViewportConfig {
    /// Environment overrides: `DRIFT_MAX_FPS`, `DRIFT_DRAW_ERRORS`
    /// (`stop` | `continue`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_f32("DRIFT_MAX_FPS") {
            config.max_fps = v.clamp(1.0, 1000.0);
        }
        if let Ok(v) = std::env::var("DRIFT_DRAW_ERRORS") {
            match v.trim().to_ascii_lowercase().as_str() {
                "stop" => config.on_draw_error = DrawPolicy::Stop,
                "continue" => config.on_draw_error = DrawPolicy::Continue,
                _ => log::warn!("DRIFT_DRAW_ERRORS={v} not recognized, keeping default"),
            }
        }
        config
    }
}

fn env_f32(name: &str) -> Option<f32> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
}

/// The visible-region state. `pos` is the top-left corner of the region in
/// world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pos: Vec2,
    pub size: Vec2,
    pub scale: f32,
}

impl Camera {
    fn at_origin() -> Self {
        Self {
            pos: Vec2::ZERO,
            size: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

/// Read-only snapshot of the world-space rectangle the viewport shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Owns a drawing context, a camera, and the pacing state for a
/// self-adjusting refresh loop.
///
/// `W` is the caller's opaque world type, handed back to the draw callback.
pub struct ViewportDevice<C: Canvas2d, W = ()> {
    ctx: C,
    size: SurfaceSize,
    camera: Camera,
    config: ViewportConfig,
    world: Option<W>,
    autorefresh: bool,
    pacer: FramePacer,
    on_draw: Option<DrawFn<C, W>>,
}

impl<C: Canvas2d, W> ViewportDevice<C, W> {
    /// Takes ownership of the context and sets its physical size. The
    /// autorefresh flag starts enabled; ticking is host-driven (`run`, or an
    /// event loop calling `refresh`).
    pub fn new(mut ctx: C, width: u32, height: u32, config: ViewportConfig) -> Self {
        let size = SurfaceSize::new(width, height);
        ctx.resize(size);
        Self {
            ctx,
            size,
            camera: Camera::at_origin(),
            pacer: FramePacer::new(config.max_fps, Instant::now()),
            config,
            world: None,
            autorefresh: true,
            on_draw: None,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn ctx(&self) -> &C {
        &self.ctx
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    pub fn autorefresh(&self) -> bool {
        self.autorefresh
    }

    /// Toggles the continuous-redraw flag. Any change restarts the fps
    /// sample baseline; setting the current value is a no-op.
    pub fn set_autorefresh(&mut self, enabled: bool) {
        if self.autorefresh == enabled {
            return;
        }
        self.autorefresh = enabled;
        self.pacer.reset(Instant::now());
    }

    /// Centers the camera on `point` and resets size/scale to the viewport
    /// extent at zoom 1.
    pub fn set_camera_pos(&mut self, point: Vec2) {
        let extent = self.size.as_vec2();
        self.camera.pos = point - extent / 2.0;
        self.camera.size = extent;
        self.camera.scale = 1.0;
    }

    pub fn get_camera_box(&self) -> CameraBox {
        CameraBox {
            x: self.camera.pos.x,
            y: self.camera.pos.y,
            w: self.camera.size.x,
            h: self.camera.size.y,
        }
    }

    /// Stores the world reference for the draw callback. Not validated.
    pub fn set_world(&mut self, world: W) {
        self.world = Some(world);
    }

    pub fn world(&self) -> Option<&W> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut W> {
        self.world.as_mut()
    }

    /// World coordinates -> viewport-local coordinates.
    pub fn translate(&self, point: Vec2) -> Vec2 {
        point - self.camera.pos
    }

    pub fn set_on_draw<F>(&mut self, f: F)
    where
        F: FnMut(&mut C, &Camera, Option<&W>) -> Result<(), DrawError> + 'static,
    {
        self.on_draw = Some(Box::new(f));
    }

    pub fn refresh(&mut self, alpha: f32) -> Result<(), DrawError> {
        self.refresh_at(alpha, Instant::now())
    }

    /// One refresh tick. `alpha` is reserved for interpolation and currently
    /// unused. Draws when the pacer says so, applying the configured error
    /// policy to a failing callback.
    pub fn refresh_at(&mut self, _alpha: f32, now: Instant) -> Result<(), DrawError> {
        if self.pacer.tick(now) {
            if let Err(err) = self.draw() {
                match self.config.on_draw_error {
                    DrawPolicy::Continue => {
                        log::warn!("draw callback failed, continuing: {err}");
                    }
                    DrawPolicy::Stop => {
                        self.autorefresh = false;
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    /// Clears the viewport, runs the draw callback under a saved identity
    /// transform, and restores the context state (also when the callback
    /// fails).
    pub fn draw(&mut self) -> Result<(), DrawError> {
        self.ctx.clear_rect(Rect::from_size(self.size));
        self.ctx.save();
        self.ctx.translate(Vec2::ZERO);
        let result = match self.on_draw.as_mut() {
            Some(on_draw) => on_draw(&mut self.ctx, &self.camera, self.world.as_ref()),
            None => Ok(()),
        };
        self.ctx.restore();
        result
    }

    /// Blocking refresh loop: ticks at ~1ms granularity while the
    /// autorefresh flag stays set. A draw error under the stop policy ends
    /// the loop and propagates; under the continue policy the loop only ends
    /// once something clears the flag.
    pub fn run(&mut self) -> Result<(), DrawError> {
        while self.autorefresh {
            self.refresh(0.0)?;
            thread::sleep(TICK_INTERVAL);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::canvas::Color;

    /// Records the call sequence the viewport makes against its context.
    struct TraceCanvas {
        size: SurfaceSize,
        calls: Vec<&'static str>,
    }

    impl TraceCanvas {
        fn new() -> Self {
            Self {
                size: SurfaceSize::new(0, 0),
                calls: Vec::new(),
            }
        }

        fn note(&mut self, call: &'static str) {
            self.calls.push(call);
        }
    }

    impl Canvas2d for TraceCanvas {
        fn size(&self) -> SurfaceSize {
            self.size
        }

        fn resize(&mut self, size: SurfaceSize) {
            self.size = size;
            self.calls.push("resize");
        }

        fn clear_rect(&mut self, _rect: Rect) {
            self.calls.push("clear_rect");
        }

        fn save(&mut self) {
            self.calls.push("save");
        }

        fn restore(&mut self) {
            self.calls.push("restore");
        }

        fn translate(&mut self, _offset: Vec2) {
            self.calls.push("translate");
        }

        fn fill_rect(&mut self, _rect: Rect, _color: Color) {
            self.calls.push("fill_rect");
        }
    }

    fn trace_device() -> ViewportDevice<TraceCanvas> {
        ViewportDevice::new(TraceCanvas::new(), 800, 600, ViewportConfig::default())
    }

    #[test]
    fn construction_sizes_the_context_and_enables_autorefresh() {
        let device = trace_device();
        assert_eq!(device.ctx().size(), SurfaceSize::new(800, 600));
        assert_eq!(device.ctx().calls, vec!["resize"]);
        assert!(device.autorefresh());
        assert_eq!(device.camera().scale, 1.0);
        assert_eq!(device.camera().pos, Vec2::ZERO);
    }

    #[test]
    fn set_camera_pos_centers_the_point() {
        let mut device = trace_device();
        device.set_camera_pos(Vec2::new(400.0, 300.0));
        let cam = device.get_camera_box();
        assert_eq!(cam.x, 0.0);
        assert_eq!(cam.y, 0.0);
        assert_eq!(cam.w, 800.0);
        assert_eq!(cam.h, 600.0);
    }

    #[test]
    fn set_camera_pos_resets_scale() {
        let mut device = trace_device();
        device.set_camera_pos(Vec2::new(100.0, 100.0));
        assert_eq!(device.camera().scale, 1.0);
        assert_eq!(device.camera().size, Vec2::new(800.0, 600.0));
    }

    #[test]
    fn translate_subtracts_the_camera_origin() {
        let mut device = trace_device();
        device.set_camera_pos(Vec2::new(400.0, 300.0));
        assert_eq!(
            device.translate(Vec2::new(410.0, 320.0)),
            Vec2::new(410.0, 320.0)
        );

        device.set_camera_pos(Vec2::new(500.0, 300.0));
        assert_eq!(
            device.translate(Vec2::new(410.0, 320.0)),
            Vec2::new(310.0, 320.0)
        );
    }

    #[test]
    fn camera_box_is_zero_sized_before_any_camera_move() {
        let device = trace_device();
        let cam = device.get_camera_box();
        assert_eq!((cam.x, cam.y, cam.w, cam.h), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn draw_wraps_the_callback_in_clear_save_translate_restore() {
        let mut device = trace_device();
        device.set_on_draw(|ctx: &mut TraceCanvas, _camera, _world| {
            ctx.note("ondraw");
            Ok(())
        });
        device.draw().unwrap();
        assert_eq!(
            device.ctx().calls,
            vec!["resize", "clear_rect", "save", "translate", "ondraw", "restore"]
        );
    }

    #[test]
    fn draw_restores_even_when_the_callback_fails() {
        let mut device = trace_device();
        device.set_on_draw(|_ctx, _camera, _world| Err("boom".into()));
        assert!(device.draw().is_err());
        assert_eq!(device.ctx().calls.last(), Some(&"restore"));
    }

    #[test]
    fn world_is_passed_through_to_the_callback() {
        let mut device: ViewportDevice<TraceCanvas, u32> =
            ViewportDevice::new(TraceCanvas::new(), 64, 48, ViewportConfig::default());
        let seen = Rc::new(Cell::new(None));
        let sink = Rc::clone(&seen);
        device.set_on_draw(move |_ctx, _camera, world| {
            sink.set(world.copied());
            Ok(())
        });

        device.draw().unwrap();
        assert_eq!(seen.get(), None);

        device.set_world(7);
        device.draw().unwrap();
        assert_eq!(seen.get(), Some(7));
        assert_eq!(device.world(), Some(&7));
    }

    #[test]
    fn stop_policy_halts_the_loop_on_a_failed_draw() {
        let mut device = trace_device();
        device.set_on_draw(|_ctx, _camera, _world| Err("boom".into()));

        let t0 = Instant::now();
        assert!(device.refresh_at(0.0, t0).is_err());
        assert!(!device.autorefresh());
    }

    #[test]
    fn continue_policy_logs_and_keeps_going() {
        let config = ViewportConfig {
            on_draw_error: DrawPolicy::Continue,
            ..ViewportConfig::default()
        };
        let mut device: ViewportDevice<TraceCanvas> =
            ViewportDevice::new(TraceCanvas::new(), 64, 48, config);
        let draws = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&draws);
        device.set_on_draw(move |_ctx, _camera, _world| {
            counter.set(counter.get() + 1);
            Err("boom".into())
        });

        let t0 = Instant::now();
        assert!(device.refresh_at(0.0, t0).is_ok());
        assert!(device.refresh_at(0.0, t0 + Duration::from_millis(1)).is_ok());
        assert!(device.autorefresh());
        assert_eq!(draws.get(), 2);
    }

    #[test]
    fn refresh_skips_draws_when_the_pacer_says_so() {
        let mut device = trace_device();
        let draws = Rc::new(Cell::new(0u64));
        let counter = Rc::clone(&draws);
        device.set_on_draw(move |_ctx, _camera, _world| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        // Saturate one 100ms window so the pacer moves to skip 2, then check
        // that only every other tick draws.
        let t0 = Instant::now();
        for i in 0..199u64 {
            device
                .refresh_at(0.0, t0 + Duration::from_micros(500 * i))
                .unwrap();
        }
        let close = t0 + Duration::from_millis(101);
        device.refresh_at(0.0, close).unwrap();
        assert_eq!(device.pacer().frame_skip(), 2);

        let before = draws.get();
        for i in 0..10u64 {
            device
                .refresh_at(0.0, close + Duration::from_micros(500 * i))
                .unwrap();
        }
        assert_eq!(draws.get() - before, 5);
        assert_eq!(device.pacer().refresh_count(), 210);
    }

    #[test]
    fn set_autorefresh_only_acts_on_changes() {
        let mut device = trace_device();
        assert!(device.autorefresh());
        device.set_autorefresh(true);
        assert!(device.autorefresh());
        device.set_autorefresh(false);
        assert!(!device.autorefresh());
        device.set_autorefresh(true);
        assert!(device.autorefresh());
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config: ViewportConfig = serde_json::from_str(r#"{"max_fps": 30.0}"#).unwrap();
        assert_eq!(config.max_fps, 30.0);
        assert_eq!(config.on_draw_error, DrawPolicy::Stop);

        let config: ViewportConfig =
            serde_json::from_str(r#"{"max_fps": 30.0, "on_draw_error": "continue"}"#).unwrap();
        assert_eq!(config.on_draw_error, DrawPolicy::Continue);
    }
}
