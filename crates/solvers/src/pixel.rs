//! Pure-computation rasterization of plots into an RGBA8 pixel buffer.
//!
//! This module is always available (no feature gate) so that both the `png`
//! snapshot path and the WASM path can share the same drawing code. Lines
//! are one pixel wide and unantialiased.

use fieldviz_core::{Charge, ContourPlot, FieldError, FieldLinePlot, QuiverArrow};
use glam::DVec2;

/// An RGBA8 color.
pub type Rgba = [u8; 4];

pub const WHITE: Rgba = [255, 255, 255, 255];
pub const BLACK: Rgba = [0, 0, 0, 255];
pub const GREY: Rgba = [128, 128, 128, 255];
pub const RED: Rgba = [255, 0, 0, 255];
pub const BLUE: Rgba = [0, 0, 255, 255];

/// Radius of the disc drawn for each charge, in pixels.
pub const CHARGE_RADIUS: f64 = 10.0;

/// Quiver arrows longer than this are clamped.
pub const MAX_QUIVER_LENGTH: f64 = 40.0;

/// Side length of field-line and contour arrowheads.
const ARROW_SIZE: f64 = 8.0;

/// A width × height RGBA8 image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Raster {
    /// A white canvas.
    ///
    /// Returns `FieldError::InvalidDimensions` if either side is zero.
    pub fn new(width: usize, height: usize) -> Result<Self, FieldError> {
        if width == 0 || height == 0 {
            return Err(FieldError::InvalidDimensions);
        }
        let data = WHITE.repeat(width * height);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The buffer, four bytes (R, G, B, A) per pixel.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.data
    }

    /// Color at `(x, y)`, or `None` off the image.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.data[i..i + 4]);
        Some(rgba)
    }

    /// Writes one pixel; coordinates off the image are ignored.
    fn put(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&color);
    }

    fn put_point(&mut self, p: DVec2, color: Rgba) {
        self.put(p.x.floor() as i64, p.y.floor() as i64, color);
    }

    /// Straight line from `a` to `b`, sampled once per pixel of the longer
    /// axis.
    pub fn draw_line(&mut self, a: DVec2, b: DVec2, color: Rgba) {
        if !(a.is_finite() && b.is_finite()) {
            return;
        }
        let d = b - a;
        let steps = d.x.abs().max(d.y.abs()).ceil().max(1.0);
        // Bound the loop for lines that run far off the image.
        let limit = 4.0 * (self.width + self.height) as f64;
        let n = steps.min(limit) as usize;
        for k in 0..=n {
            self.put_point(a + d * (k as f64 / n as f64), color);
        }
    }

    pub fn draw_polyline(&mut self, points: &[DVec2], color: Rgba) {
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], color);
        }
        if let [only] = points {
            self.put_point(*only, color);
        }
    }

    /// Filled triangular arrowhead with its tip at `tip`, pointing along
    /// `direction`.
    pub fn draw_arrowhead(&mut self, tip: DVec2, direction: DVec2, size: f64, color: Rgba) {
        let Some(dir) = direction.try_normalize() else {
            return;
        };
        let normal = dir.perp();
        let back = tip - dir * size;
        let left = back + normal * (size * 0.5);
        let right = back - normal * (size * 0.5);
        let fan = (size * 2.0).ceil().max(1.0) as usize;
        for k in 0..=fan {
            let base = left.lerp(right, k as f64 / fan as f64);
            self.draw_line(tip, base, color);
        }
    }

    pub fn fill_disc(&mut self, center: DVec2, radius: f64, color: Rgba) {
        if !center.is_finite() || radius <= 0.0 {
            return;
        }
        let x0 = (center.x - radius).floor() as i64;
        let x1 = (center.x + radius).ceil() as i64;
        let y0 = (center.y - radius).floor() as i64;
        let y1 = (center.y + radius).ceil() as i64;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);
                if p.distance_squared(center) <= radius * radius {
                    self.put(x, y, color);
                }
            }
        }
    }

    /// Red discs for positive charges, blue for negative, grey for neutral.
    pub fn draw_charges(&mut self, charges: &[Charge]) {
        for c in charges {
            let color = if c.charge > 0.0 {
                RED
            } else if c.charge < 0.0 {
                BLUE
            } else {
                GREY
            };
            self.fill_disc(c.position(), CHARGE_RADIUS, color);
        }
    }
}

/// Draws every visible segment of every field line with its arrow, then the
/// charges on top.
pub fn render_field_lines(
    plot: &FieldLinePlot,
    charges: &[Charge],
    width: usize,
    height: usize,
) -> Result<Raster, FieldError> {
    let mut raster = Raster::new(width, height)?;
    for line in &plot.lines {
        for segment in &line.segments {
            let end = segment.end.min(line.points.len());
            if segment.start < end {
                raster.draw_polyline(&line.points[segment.start..end], BLACK);
            }
            if let Some(arrow) = segment.arrow {
                raster.draw_arrowhead(arrow.position, arrow.direction, ARROW_SIZE, BLACK);
            }
        }
    }
    raster.draw_charges(charges);
    Ok(raster)
}

/// Draws contours (closed ones joined back to their start) and any direction
/// arrows, then the charges.
///
/// Arrow positions carry no direction, so they are marked with a small disc.
pub fn render_contours(
    plot: &ContourPlot,
    charges: &[Charge],
    width: usize,
    height: usize,
) -> Result<Raster, FieldError> {
    let mut raster = Raster::new(width, height)?;
    for contour in &plot.contours {
        raster.draw_polyline(&contour.points, BLACK);
        if contour.closed {
            if let (Some(first), Some(last)) = (contour.points.first(), contour.points.last()) {
                raster.draw_line(*last, *first, BLACK);
            }
        }
    }
    for arrow in &plot.arrows {
        raster.fill_disc(*arrow, ARROW_SIZE * 0.5, BLACK);
    }
    raster.draw_charges(charges);
    Ok(raster)
}

/// Draws each quiver sample as a shaft centred on its lattice point, clamped
/// to [`MAX_QUIVER_LENGTH`], with a head proportional to its length.
pub fn render_quiver(
    arrows: &[QuiverArrow],
    charges: &[Charge],
    width: usize,
    height: usize,
) -> Result<Raster, FieldError> {
    let mut raster = Raster::new(width, height)?;
    for arrow in arrows {
        let mut v = arrow.vector();
        let length = v.length();
        if !length.is_finite() || length == 0.0 {
            continue;
        }
        if length > MAX_QUIVER_LENGTH {
            v *= MAX_QUIVER_LENGTH / length;
        }
        let tail = arrow.position() - v * 0.5;
        let tip = tail + v;
        raster.draw_line(tail, tip, BLACK);
        raster.draw_arrowhead(tip, v, v.length() * 0.2, BLACK);
    }
    raster.draw_charges(charges);
    Ok(raster)
}
