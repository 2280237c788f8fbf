//! Pixel-space primitives shared by the aggregator, overlay and renderers.

use serde::{Deserialize, Serialize};

/// A 2D point in either image pixels, world meters or screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Width/height pair. Zero means "not known yet".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are strictly positive and finite.
    #[inline]
    pub fn is_known(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Detection bounding box `[x, y, w, h]` in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from a wire array. Anything shorter than four entries is the
    /// degenerate `[0, 0, 0, 0]` box.
    pub fn from_slice(values: &[f64]) -> Self {
        match values {
            [x, y, w, h, ..] => Self::new(*x, *y, *w, *h),
            _ => Self::default(),
        }
    }

    /// Bottom-center of the box: where the person touches the floor.
    #[inline]
    pub fn foot_point(self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height)
    }
}

/// Independent per-axis scale from source-frame pixels to viewport pixels.
///
/// Returns `None` while either size is unknown so callers never divide by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    pub sx: f64,
    pub sy: f64,
}

impl AxisScale {
    pub fn between(frame: Size, viewport: Size) -> Option<Self> {
        if !frame.is_known() || !viewport.is_known() {
            return None;
        }
        Some(Self {
            sx: viewport.width / frame.width,
            sy: viewport.height / frame.height,
        })
    }

    #[inline]
    pub fn apply(self, p: Point) -> Point {
        Point::new(p.x * self.sx, p.y * self.sy)
    }
}

/// Normalized source rectangle (`min`, `max` in 0..=1) that crops a frame so
/// it covers the viewport without letterboxing.
pub fn cover_uv(frame: Size, viewport: Size) -> Option<(Point, Point)> {
    if !frame.is_known() || !viewport.is_known() {
        return None;
    }
    let frame_aspect = frame.width / frame.height;
    let view_aspect = viewport.width / viewport.height;
    if frame_aspect > view_aspect {
        // Frame is wider: crop left/right.
        let visible = view_aspect / frame_aspect;
        let margin = (1.0 - visible) / 2.0;
        Some((Point::new(margin, 0.0), Point::new(1.0 - margin, 1.0)))
    } else {
        let visible = frame_aspect / view_aspect;
        let margin = (1.0 - visible) / 2.0;
        Some((Point::new(0.0, margin), Point::new(1.0, 1.0 - margin)))
    }
}
