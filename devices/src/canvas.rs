//! Immediate-mode 2D drawing seam.
//!
//! `Canvas2d` is the abstraction layer between the viewport (which owns a
//! context and drives draws) and presentation. The CPU implementation here
//! renders into an in-memory RGBA buffer, which works for both headless runs
//! and tests and for headful presentation (the buffer is blitted to a window
//! surface by the app runner).

use glam::Vec2;

pub type Color = [u8; 4];

const CLEAR: Color = [0, 0, 0, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn rgba_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// An axis-aligned rectangle in drawing coordinates. May lie partly or fully
/// outside the surface; drawing clips.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_size(size: SurfaceSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: size.width as f32,
            h: size.height as f32,
        }
    }
}

/// A 2D immediate-mode drawing context.
///
/// The transform state is a translation offset with a save/restore stack;
/// `restore` with nothing saved is a no-op. Draw callbacks only talk to this
/// trait, so the backing store can be swapped (or recorded) in tests.
pub trait Canvas2d {
    fn size(&self) -> SurfaceSize;

    /// Sets the physical surface size, clearing content and transform state.
    fn resize(&mut self, size: SurfaceSize);

    fn clear_rect(&mut self, rect: Rect);
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, offset: Vec2);
    fn fill_rect(&mut self, rect: Rect, color: Color);
}

/// CPU context drawing into an RGBA buffer.
#[derive(Debug, Clone)]
pub struct RgbaCanvas {
    size: SurfaceSize,
    buf: Vec<u8>,
    offset: Vec2,
    saved: Vec<Vec2>,
}

impl RgbaCanvas {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            buf: vec![0u8; size.rgba_len()],
            offset: Vec2::ZERO,
            saved: Vec::new(),
        }
    }

    pub fn frame(&self) -> &[u8] {
        &self.buf
    }

    fn write_rect(&mut self, rect: Rect, color: Color) {
        if rect.w <= 0.0 || rect.h <= 0.0 || self.buf.len() < self.size.rgba_len() {
            return;
        }

        let width = self.size.width as i64;
        let height = self.size.height as i64;
        let x0 = ((rect.x + self.offset.x).floor() as i64).clamp(0, width) as usize;
        let y0 = ((rect.y + self.offset.y).floor() as i64).clamp(0, height) as usize;
        let x1 = ((rect.x + self.offset.x + rect.w).floor() as i64).clamp(0, width) as usize;
        let y1 = ((rect.y + self.offset.y + rect.h).floor() as i64).clamp(0, height) as usize;
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let stride = self.size.width as usize * 4;
        for y in y0..y1 {
            let row = &mut self.buf[y * stride + x0 * 4..y * stride + x1 * 4];
            for px in row.chunks_exact_mut(4) {
                px.copy_from_slice(&color);
            }
        }
    }
}

impl Canvas2d for RgbaCanvas {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.buf.clear();
        self.buf.resize(size.rgba_len(), 0u8);
        self.offset = Vec2::ZERO;
        self.saved.clear();
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.write_rect(rect, CLEAR);
    }

    fn save(&mut self) {
        self.saved.push(self.offset);
    }

    fn restore(&mut self) {
        if let Some(prev) = self.saved.pop() {
            self.offset = prev;
        }
    }

    fn translate(&mut self, offset: Vec2) {
        self.offset += offset;
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.write_rect(rect, color);
    }
}
