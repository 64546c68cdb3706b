use crate::error::{Error, Result};
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BBox([x1, y1, x2, y2], PhantomData)
    }

    /// Inverted, empty or non-finite boxes are rejected.
    pub fn validate(&self) -> Result<()> {
        let finite = self.0.iter().all(|v| v.is_finite());

        if finite && self.right() > self.left() && self.bottom() > self.top() {
            Ok(())
        } else {
            Err(Error::InvalidBBox(self.0))
        }
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right() - self.left()
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom() - self.top()
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(
            (self.left() + self.right()) * 0.5,
            (self.top() + self.bottom()) * 0.5,
        )
    }

    /// Corners snapped to a grid of `quantum` pixels.
    pub fn quantized(&self, quantum: f32) -> [i32; 4] {
        let q = |v: f32| (v / quantum).round() as i32;

        [q(self.0[0]), q(self.0[1]), q(self.0[2]), q(self.0[3])]
    }

    #[inline]
    pub fn as_xywh(&self) -> BBox<Xywh> {
        self.into()
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        BBox([cx, cy, w, h], PhantomData)
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xywh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        let c = v.center();

        Self::xywh(c.x, c.y, v.width(), v.height())
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        let w2 = v.width() / 2.0;
        let h2 = v.height() / 2.0;

        Self::ltrb(v.cx() - w2, v.cy() - h2, v.cx() + w2, v.cy() + h2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_geometry() {
        let b = BBox::ltrb(10.0, 20.0, 110.0, 70.0);

        assert_relative_eq!(b.width(), 100.0);
        assert_relative_eq!(b.height(), 50.0);
        assert_relative_eq!(b.area(), 5000.0);
        assert_relative_eq!(b.center().x, 60.0);
        assert_relative_eq!(b.center().y, 45.0);
    }

    #[test]
    fn test_inverted_rejected() {
        assert!(matches!(
            BBox::ltrb(10.0, 10.0, 5.0, 20.0).validate(),
            Err(Error::InvalidBBox(_))
        ));
        assert!(BBox::ltrb(0.0, 0.0, 0.0, 10.0).validate().is_err());
        assert!(BBox::ltrb(0.0, f32::NAN, 1.0, 10.0).validate().is_err());
        assert!(BBox::ltrb(0.0, 0.0, 1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_xywh_conversion() {
        let b = BBox::ltrb(10.0, 20.0, 30.0, 60.0);
        let c = b.as_xywh();

        assert_relative_eq!(c.cx(), 20.0);
        assert_relative_eq!(c.cy(), 40.0);
        assert_eq!(c.as_ltrb(), b);
    }

    #[test]
    fn test_quantized() {
        let b = BBox::ltrb(10.4, 19.6, 30.0, 41.0);

        assert_eq!(b.quantized(1.0), [10, 20, 30, 41]);
        assert_eq!(b.quantized(10.0), [1, 2, 3, 4]);
    }
}
