//! Signature pad
//!
//! Collects free-hand strokes on a fixed-size canvas and rasterises them to
//! an 8-bit greyscale image (white paper, black ink), encoded as binary PGM.

use doorflow_api::MediaPayload;
use serde::{Deserialize, Serialize};

use super::CaptureError;

/// Content type of encoded signatures
pub const SIGNATURE_CONTENT_TYPE: &str = "image/x-portable-graymap";

const DEFAULT_WIDTH: u32 = 600;
const DEFAULT_HEIGHT: u32 = 200;
const DEFAULT_PEN_WIDTH: f32 = 2.5;

/// Largest canvas side accepted, in pixels
pub const MAX_CANVAS_SIDE: u32 = 4096;

const PAPER: u8 = 255;
const INK: u8 = 0;

/// Canvas position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One pen-down to pen-up path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
}

/// Serialized strokes, as exported by a drawing surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureStrokes {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    pub strokes: Vec<Stroke>,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

/// Drawing surface fed by pointer events
#[derive(Debug, Clone)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    pen_width: f32,
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl SignaturePad {
    /// Sides are clamped to `1..=MAX_CANVAS_SIDE`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(1, MAX_CANVAS_SIDE),
            height: height.clamp(1, MAX_CANVAS_SIDE),
            pen_width: DEFAULT_PEN_WIDTH,
            strokes: Vec::new(),
            active: None,
        }
    }

    pub fn with_pen_width(mut self, pen_width: f32) -> Self {
        self.pen_width = pen_width.max(1.0);
        self
    }

    /// Pad pre-filled from exported strokes. Canvas sides must be in
    /// `1..=MAX_CANVAS_SIDE`.
    pub fn from_strokes(strokes: SignatureStrokes) -> Result<Self, CaptureError> {
        let (width, height) = (strokes.width, strokes.height);
        if !(1..=MAX_CANVAS_SIDE).contains(&width) || !(1..=MAX_CANVAS_SIDE).contains(&height) {
            return Err(CaptureError::CanvasSize {
                width,
                height,
                max: MAX_CANVAS_SIDE,
            });
        }

        let mut pad = Self::new(width, height);
        for stroke in strokes.strokes {
            let points: Vec<Point> = stroke.points.iter().map(|p| pad.clamp(p.x, p.y)).collect();
            if !points.is_empty() {
                pad.strokes.push(Stroke { points });
            }
        }
        Ok(pad)
    }

    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        Self::from_strokes(serde_json::from_str(json)?)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn clamp(&self, x: f32, y: f32) -> Point {
        Point {
            x: x.clamp(0.0, (self.width - 1) as f32),
            y: y.clamp(0.0, (self.height - 1) as f32),
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.pointer_up();
        let point = self.clamp(x, y);
        self.active = Some(Stroke { points: vec![point] });
    }

    /// Ignored unless the pen is down
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let point = self.clamp(x, y);
        if let Some(stroke) = self.active.as_mut() {
            stroke.points.push(point);
        }
    }

    pub fn pointer_up(&mut self) {
        if let Some(stroke) = self.active.take() {
            self.strokes.push(stroke);
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.active.is_none()
    }

    /// Finished strokes
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Lift the pen and rasterise what was drawn
    pub fn finish(&mut self) -> Result<Signature, CaptureError> {
        self.pointer_up();
        if self.is_empty() {
            return Err(CaptureError::EmptySignature);
        }

        let len = (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or(CaptureError::CanvasSize {
                width: self.width,
                height: self.height,
                max: MAX_CANVAS_SIDE,
            })?;
        let mut pixels = vec![PAPER; len];
        let radius = self.pen_width / 2.0;
        for stroke in &self.strokes {
            match stroke.points.as_slice() {
                [only] => stamp_segment(&mut pixels, self.width, self.height, *only, *only, radius),
                points => {
                    for pair in points.windows(2) {
                        stamp_segment(&mut pixels, self.width, self.height, pair[0], pair[1], radius);
                    }
                }
            }
        }

        Ok(Signature {
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}

/// Ink every pixel whose centre lies within `radius` of segment `a`-`b`
fn stamp_segment(pixels: &mut [u8], width: u32, height: u32, a: Point, b: Point, radius: f32) {
    let min_x = (a.x.min(b.x) - radius).floor().max(0.0) as u32;
    let max_x = ((a.x.max(b.x) + radius).ceil() as u32).min(width - 1);
    let min_y = (a.y.min(b.y) - radius).floor().max(0.0) as u32;
    let max_y = ((a.y.max(b.y) + radius).ceil() as u32).min(height - 1);

    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let t = if len_sq == 0.0 {
                0.0
            } else {
                (((px - a.x) * dx + (py - a.y) * dy) / len_sq).clamp(0.0, 1.0)
            };
            let (cx, cy) = (a.x + t * dx, a.y + t * dy);
            let dist_sq = (px - cx).powi(2) + (py - cy).powi(2);
            if dist_sq <= radius * radius {
                if let Some(pixel) = pixels.get_mut(y as usize * width as usize + x as usize) {
                    *pixel = INK;
                }
            }
        }
    }
}

/// A rasterised, non-empty signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Signature {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Greyscale value at (x, y); 0 is ink, 255 is paper
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn ink_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p == INK).count()
    }

    /// Binary PGM (P5) encoding
    pub fn to_pgm(&self) -> Vec<u8> {
        let header = format!("P5\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }

    pub fn to_payload(&self) -> MediaPayload {
        MediaPayload::new(SIGNATURE_CONTENT_TYPE, self.to_pgm())
    }

    /// Form the backend expects in sign-off bodies
    pub fn to_data_url(&self) -> String {
        self.to_payload().to_data_url()
    }
}
