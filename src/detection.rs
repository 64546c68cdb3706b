use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::error::{Error, Result};
use nalgebra as na;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Vehicle,
    Trash,
    Bin,
}

/// Where a piece of trash lies relative to the nearest bin.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisposalContext {
    Proper,
    #[default]
    Improper,
}

/// Trust in a trash detection, promoted after repeated sightings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    #[default]
    Potential,
    Confirmed,
}

/// Image-space center, with the depth value sampled there when a depth
/// channel is available.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub x: f32,
    pub y: f32,
    pub depth: Option<f32>,
}

impl Center {
    #[inline]
    pub fn new(x: f32, y: f32, depth: Option<f32>) -> Self {
        Self { x, y, depth }
    }

    #[inline(always)]
    pub fn point(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }

    /// 3D euclidean distance when both sides carry depth, 2D otherwise.
    pub fn distance(&self, other: &Center) -> f32 {
        let planar = na::distance_squared(&self.point(), &other.point());

        match (self.depth, other.depth) {
            (Some(a), Some(b)) => (planar + (a - b) * (a - b)).sqrt(),
            _ => planar.sqrt(),
        }
    }
}

/// One detector output for one frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub kind: ObjectKind,
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "c")]
    pub class: i32,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(default)]
    pub depth: Option<f32>,
    #[serde(default)]
    pub context: DisposalContext,
    #[serde(default)]
    pub status: Confirmation,
}

impl Detection {
    pub fn new(kind: ObjectKind, bbox: BBox<Ltrb>, class: i32, confidence: f32) -> Self {
        Self {
            kind,
            bbox,
            class,
            confidence,
            depth: None,
            context: DisposalContext::default(),
            status: Confirmation::default(),
        }
    }

    #[inline]
    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = Some(depth);
        self
    }

    #[inline]
    pub fn center(&self) -> Center {
        let c = self.bbox.center();

        Center::new(c.x, c.y, self.depth)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.bbox.area()
    }

    pub fn validate(&self) -> Result<()> {
        self.bbox.validate()?;

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidDetection(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        if let Some(depth) = self.depth {
            if !depth.is_finite() {
                return Err(Error::InvalidDetection(format!("non-finite depth {}", depth)));
            }
        }

        Ok(())
    }
}
