use crate::detection::Detection;
use crate::error::{Error, Result};
use ndarray::{Array2, Array3};
use std::sync::Arc;

/// Dense optical flow, `(height, width, 2)` with `(u, v)` in the last axis.
#[derive(Debug, Clone)]
pub struct FlowField(Array3<f32>);

impl FlowField {
    pub fn new(field: Array3<f32>) -> Result<Self> {
        if field.shape()[2] != 2 {
            return Err(Error::InvalidSideChannel(format!(
                "flow field must be (h, w, 2), got {:?}",
                field.shape()
            )));
        }

        Ok(Self(field))
    }

    /// Flow vector at the integer pixel under `(x, y)`, `None` outside the field.
    pub fn at(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (r, c) = pixel(x, y, self.0.shape()[0], self.0.shape()[1])?;

        Some((self.0[[r, c, 0]], self.0[[r, c, 1]]))
    }

    pub fn magnitude_at(&self, x: f32, y: f32) -> Option<f32> {
        self.at(x, y).map(|(u, v)| (u * u + v * v).sqrt())
    }

    /// `(rows, cols)` of the field.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.0.shape()[0], self.0.shape()[1])
    }
}

/// Dense per-pixel depth, `(height, width)`.
#[derive(Debug, Clone)]
pub struct DepthMap(Array2<f32>);

impl DepthMap {
    pub fn new(map: Array2<f32>) -> Self {
        Self(map)
    }

    pub fn at(&self, x: f32, y: f32) -> Option<f32> {
        let (r, c) = pixel(x, y, self.0.nrows(), self.0.ncols())?;
        let depth = self.0[[r, c]];

        depth.is_finite().then(|| depth)
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.0.dim()
    }
}

#[inline]
fn pixel(x: f32, y: f32, rows: usize, cols: usize) -> Option<(usize, usize)> {
    if !(x >= 0.0 && y >= 0.0) {
        return None;
    }

    let (c, r) = (x as usize, y as usize);

    (r < rows && c < cols).then(|| (r, c))
}

/// Opaque encoded frame kept as event evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameImage {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

pub struct Frame {
    pub index: u64,
    pub dims: (u32, u32),
    // falls back to the configured rate when unset
    pub fps: Option<f32>,
    pub detections: Vec<Detection>,
    pub flow: Option<FlowField>,
    pub depth: Option<DepthMap>,
    pub image: Option<Arc<FrameImage>>,
}

impl Frame {
    pub fn new(index: u64, dims: (u32, u32), detections: Vec<Detection>) -> Self {
        Self {
            index,
            dims,
            fps: None,
            detections,
            flow: None,
            depth: None,
            image: None,
        }
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn with_flow(mut self, flow: FlowField) -> Self {
        self.flow = Some(flow);
        self
    }

    pub fn with_depth(mut self, depth: DepthMap) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_image(mut self, image: Arc<FrameImage>) -> Self {
        self.image = Some(image);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Rejects the whole frame if its geometry, rate, side channels or any
    /// detection is malformed.
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.dims;
        if w == 0 || h == 0 {
            return Err(Error::InvalidFrame(format!("empty frame dimensions {}x{}", w, h)));
        }

        if let Some(fps) = self.fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(Error::InvalidFrame(format!(
                    "frame rate must be positive, got {}",
                    fps
                )));
            }
        }

        let expected = (h as usize, w as usize);

        if let Some(flow) = &self.flow {
            if flow.shape() != expected {
                return Err(Error::InvalidSideChannel(format!(
                    "flow field is {:?}, frame is {:?}",
                    flow.shape(),
                    expected
                )));
            }
        }

        if let Some(depth) = &self.depth {
            if depth.shape() != expected {
                return Err(Error::InvalidSideChannel(format!(
                    "depth map is {:?}, frame is {:?}",
                    depth.shape(),
                    expected
                )));
            }
        }

        self.detections.iter().try_for_each(Detection::validate)
    }
}
