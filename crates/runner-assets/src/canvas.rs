//! Software canvas used for procedural texture generation.
//!
//! A [`Canvas`] wraps an [`RgbaImage`] and offers the handful of primitives
//! the texture recipes need. Primitives fall into classes that a backend may
//! or may not support (see [`Capabilities`]): flat fills always work, while
//! strokes, path fills and gradients return [`CanvasError::Unsupported`] when
//! the class is disabled. Callers decide per call how to degrade.

use image::{Rgba, RgbaImage};

/// An RGBA colour.
pub type Color = Rgba<u8>;

/// Opaque colour from a `0xRRGGBB` literal.
pub const fn rgb(hex: u32) -> Color {
    Rgba([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 0xff])
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Which primitive classes the drawing backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Linear gradients.
    pub gradients: bool,
    /// Outlined rectangles, circles and lines.
    pub strokes: bool,
    /// Arbitrary filled paths (triangles).
    pub paths: bool,
}

impl Capabilities {
    /// Everything available.
    pub const FULL: Self = Self {
        gradients: true,
        strokes: true,
        paths: true,
    };

    /// Only the guaranteed primitives: flat rectangles and circles.
    pub const FLAT_ONLY: Self = Self {
        gradients: false,
        strokes: false,
        paths: false,
    };
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::FULL
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while drawing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanvasError {
    /// The primitive class is disabled on this backend.
    #[error("canvas primitive '{0}' is not supported by this backend")]
    Unsupported(&'static str),

    /// Zero-sized canvases cannot be created.
    #[error("invalid canvas size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// A gradient needs at least two stops.
    #[error("gradient needs at least two colour stops, got {0}")]
    DegenerateGradient(usize),
}

// ---------------------------------------------------------------------------
// Gradient
// ---------------------------------------------------------------------------

/// A colour stop at `offset` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Color,
}

/// A linear gradient between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    start: (f32, f32),
    end: (f32, f32),
    stops: Vec<ColorStop>,
}

impl Gradient {
    /// Colour at pixel `(x, y)`, projecting onto the gradient axis.
    pub fn sample(&self, x: f32, y: f32) -> Color {
        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq <= f32::EPSILON {
            0.0
        } else {
            (((x - self.start.0) * dx + (y - self.start.1) * dy) / len_sq).clamp(0.0, 1.0)
        };

        let first = self.stops[0];
        if t <= first.offset {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = (b.offset - a.offset).max(f32::EPSILON);
                return lerp_color(a.color, b.color, (t - a.offset) / span);
            }
        }
        self.stops[self.stops.len() - 1].color
    }
}

fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    let mix = |i: usize| (a.0[i] as f32 + (b.0[i] as f32 - a.0[i] as f32) * t).round() as u8;
    Rgba([mix(0), mix(1), mix(2), mix(3)])
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Software drawing surface.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
    caps: Capabilities,
    fill: Color,
}

impl Canvas {
    /// Create a transparent canvas.
    pub fn new(width: u32, height: u32, caps: Capabilities) -> Result<Self, CanvasError> {
        if width == 0 || height == 0 {
            return Err(CanvasError::InvalidSize { width, height });
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
            caps,
            fill: rgb(0xffffff),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The capabilities this canvas was created with.
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Set the colour used by subsequent fills.
    pub fn set_fill(&mut self, color: Color) -> &mut Self {
        self.fill = color;
        self
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for px in self.image.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    /// Read one pixel. Out-of-range coordinates return `None`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.width() && y < self.height()).then(|| *self.image.get_pixel(x, y))
    }

    /// Consume the canvas and hand back the pixels.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    // -- flat primitives (always available) --------------------------------

    /// Fill an axis-aligned rectangle with the current fill colour.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        let color = self.fill;
        self.paint_rect(x, y, w, h, |_, _| color);
    }

    /// Fill a circle centred on `(cx, cy)`.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32) {
        let color = self.fill;
        let r_sq = radius * radius;
        self.paint_where(|px, py| {
            let (dx, dy) = (px - cx, py - cy);
            (dx * dx + dy * dy <= r_sq).then_some(color)
        });
    }

    // -- gated primitives ---------------------------------------------------

    /// Fill the triangle `a, b, c` (path fill).
    pub fn fill_triangle(
        &mut self,
        a: (f32, f32),
        b: (f32, f32),
        c: (f32, f32),
    ) -> Result<(), CanvasError> {
        if !self.caps.paths {
            return Err(CanvasError::Unsupported("path"));
        }
        let color = self.fill;
        let edge = |p: (f32, f32), q: (f32, f32), x: f32, y: f32| {
            (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
        };
        self.paint_where(|px, py| {
            let e0 = edge(a, b, px, py);
            let e1 = edge(b, c, px, py);
            let e2 = edge(c, a, px, py);
            let inside = (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0)
                || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0);
            inside.then_some(color)
        });
        Ok(())
    }

    /// Outline a rectangle with a band of `thickness` pixels inside its edge.
    pub fn stroke_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        thickness: i32,
        color: Color,
    ) -> Result<(), CanvasError> {
        if !self.caps.strokes {
            return Err(CanvasError::Unsupported("stroke"));
        }
        let t = thickness.max(1);
        self.paint_rect(x, y, w, t, |_, _| color);
        self.paint_rect(x, y + h - t, w, t, |_, _| color);
        self.paint_rect(x, y, t, h, |_, _| color);
        self.paint_rect(x + w - t, y, t, h, |_, _| color);
        Ok(())
    }

    /// Outline a circle with a ring of `thickness` pixels centred on `radius`.
    pub fn stroke_circle(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        thickness: f32,
        color: Color,
    ) -> Result<(), CanvasError> {
        if !self.caps.strokes {
            return Err(CanvasError::Unsupported("stroke"));
        }
        let half = thickness.max(1.0) / 2.0;
        let (inner, outer) = ((radius - half).max(0.0), radius + half);
        self.paint_where(|px, py| {
            let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            (d >= inner && d <= outer).then_some(color)
        });
        Ok(())
    }

    /// One-pixel line from `(x0, y0)` to `(x1, y1)`.
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) -> Result<(), CanvasError> {
        if !self.caps.strokes {
            return Err(CanvasError::Unsupported("stroke"));
        }
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        Ok(())
    }

    /// Build a linear gradient. This is the capability probe: it fails when
    /// gradients are unavailable.
    pub fn linear_gradient(
        &self,
        start: (f32, f32),
        end: (f32, f32),
        stops: &[ColorStop],
    ) -> Result<Gradient, CanvasError> {
        if !self.caps.gradients {
            return Err(CanvasError::Unsupported("gradient"));
        }
        if stops.len() < 2 {
            return Err(CanvasError::DegenerateGradient(stops.len()));
        }
        let mut stops = stops.to_vec();
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        Ok(Gradient { start, end, stops })
    }

    /// Fill a rectangle with a gradient.
    pub fn fill_rect_gradient(&mut self, gradient: &Gradient, x: i32, y: i32, w: i32, h: i32) {
        self.paint_rect(x, y, w, h, |px, py| gradient.sample(px as f32 + 0.5, py as f32 + 0.5));
    }

    // -- internals ----------------------------------------------------------

    fn put(&mut self, x: i32, y: i32, color: Color) {
        if x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    fn paint_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color_at: impl Fn(u32, u32) -> Color) {
        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = (x.saturating_add(w)).clamp(0, self.width() as i32) as u32;
        let y1 = (y.saturating_add(h)).clamp(0, self.height() as i32) as u32;
        for py in y0..y1 {
            for px in x0..x1 {
                self.image.put_pixel(px, py, color_at(px, py));
            }
        }
    }

    fn paint_where(&mut self, color_at: impl Fn(f32, f32) -> Option<Color>) {
        for (px, py, pixel) in self.image.enumerate_pixels_mut() {
            if let Some(color) = color_at(px as f32 + 0.5, py as f32 + 0.5) {
                *pixel = color;
            }
        }
    }
}
