use std::time::{Duration, Instant};

/// Sample window for the fps estimate. Skip adjustments happen at most once
/// per window.
const SAMPLE_WINDOW: Duration = Duration::from_millis(100);

/// Adaptive frame-skip controller.
///
/// Every refresh tick is counted; a tick draws when `refresh_count` is a
/// multiple of the current skip interval. Whenever more than the sample
/// window has elapsed, the controller folds the window's drawn-frame count
/// into an exponential-moving-average fps estimate and nudges the skip
/// interval by at most one step: up when the estimate exceeds the ceiling,
/// down (never below 1) when it falls under it.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    max_fps: f32,
    frame_skip: u32,
    refresh_count: u64,
    frames_in_window: u32,
    window_start: Instant,
    current_fps: f32,
    average_fps: f32,
}

impl FramePacer {
    pub fn new(max_fps: f32, now: Instant) -> Self {
        Self {
            max_fps,
            frame_skip: 1,
            refresh_count: 0,
            frames_in_window: 0,
            window_start: now,
            current_fps: 0.0,
            average_fps: 0.0,
        }
    }

    pub fn max_fps(&self) -> f32 {
        self.max_fps
    }

    /// Ticks between draws; 1 means every tick draws.
    pub fn frame_skip(&self) -> u32 {
        self.frame_skip
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    pub fn current_fps(&self) -> f32 {
        self.current_fps
    }

    /// Last published fps estimate (updated when a sample window closes).
    pub fn average_fps(&self) -> f32 {
        self.average_fps
    }

    /// Restarts the sample window, e.g. after the refresh loop was paused.
    pub fn reset(&mut self, now: Instant) {
        self.window_start = now;
        self.frames_in_window = 0;
    }

    /// Counts one refresh tick at `now` and returns whether it should draw.
    pub fn tick(&mut self, now: Instant) -> bool {
        let draw = self.refresh_count % u64::from(self.frame_skip) == 0;
        if draw {
            self.frames_in_window += 1;
        }

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed > SAMPLE_WINDOW {
            let elapsed_ms = elapsed.as_secs_f32() * 1000.0;
            self.current_fps =
                self.current_fps * 0.9 + (elapsed_ms / 10.0) * self.frames_in_window as f32 * 0.1;

            if self.current_fps > self.max_fps {
                self.frame_skip += 1;
                log::debug!(
                    "fps estimate {:.1} above ceiling {:.1}, frame_skip -> {}",
                    self.current_fps,
                    self.max_fps,
                    self.frame_skip
                );
            } else if self.frame_skip > 1 && self.current_fps < self.max_fps {
                self.frame_skip -= 1;
                log::debug!(
                    "fps estimate {:.1} below ceiling {:.1}, frame_skip -> {}",
                    self.current_fps,
                    self.max_fps,
                    self.frame_skip
                );
            }

            self.window_start = now;
            self.frames_in_window = 0;
            self.average_fps = self.current_fps;
        }

        self.refresh_count += 1;
        draw
    }
}
