//! Speed estimation for tracked objects.
//!
//! With a depth value at both ends of a step the centers are lifted into a
//! camera frame (pinhole model) and the speed is metric distance per second.
//! Without depth the speed is plain pixel distance per frame. Either way the
//! raw sample is snapped to zero below `speed_snap` and blended into an
//! exponential moving average.

use crate::circular_queue::CircularQueue;
use crate::config::Config;
use crate::detection::Center;
use crate::math;
use nalgebra as na;

const TREND_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    principal: na::Point2<f32>,
    focal: f32,
    fps: f32,
    reference_area: f32,
    reference_depth: f32,
    reference_distance: f32,
}

impl CameraModel {
    pub fn new(dims: (u32, u32), config: &Config) -> Self {
        let (w, h) = dims;
        let half_fov = config.fov_deg.to_radians() * 0.5;

        Self {
            principal: na::Point2::new(w as f32 * 0.5, h as f32 * 0.5),
            focal: w as f32 / (2.0 * half_fov.tan()),
            fps: config.fps,
            reference_area: config.reference_area,
            reference_depth: config.reference_depth,
            reference_distance: config.reference_distance,
        }
    }

    /// Same camera sampled at `fps` frames per second.
    #[inline]
    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = fps;
        self
    }

    #[inline]
    pub fn focal_length(&self) -> f32 {
        self.focal
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Distance from the camera.
    ///
    /// An object of `reference_area` pixels with depth value `reference_depth`
    /// sits at `reference_distance`. Apparent area falls with the square of the
    /// distance and the depth value grows linearly with it; the two inverted
    /// estimates are averaged.
    pub fn distance(&self, area: f32, depth: f32) -> f32 {
        let by_size = self.reference_distance * (self.reference_area / area.max(1.0)).sqrt();
        let by_depth = self.reference_distance * depth.max(0.0) / self.reference_depth;

        (by_size + by_depth) * 0.5
    }

    pub fn triangulate(&self, center: &Center, area: f32) -> Option<na::Point3<f32>> {
        let z = self.distance(area, center.depth?);
        let offset = center.point() - self.principal;

        Some(na::Point3::new(
            offset.x * z / self.focal,
            offset.y * z / self.focal,
            z,
        ))
    }
}

/// Speed history of one track.
#[derive(Debug, Clone)]
pub struct Kinematics {
    samples: CircularQueue<f32>,
    smoothed: f32,
    last_image: na::Point2<f32>,
    last_world: Option<na::Point3<f32>>,
}

impl Kinematics {
    pub fn new(capacity: usize, camera: &CameraModel, center: &Center, area: f32) -> Self {
        Self {
            samples: CircularQueue::singleton(capacity, 0.0),
            smoothed: 0.0,
            last_image: center.point(),
            last_world: camera.triangulate(center, area),
        }
    }

    /// Records the step to a new center and returns the raw speed sample.
    pub fn observe(
        &mut self,
        camera: &CameraModel,
        center: &Center,
        area: f32,
        config: &Config,
    ) -> f32 {
        let image = center.point();
        let world = camera.triangulate(center, area);

        let raw = match (self.last_world, world) {
            (Some(prev), Some(curr)) => na::distance(&prev, &curr) * camera.fps(),
            _ => na::distance(&self.last_image, &image),
        };

        let raw = if raw < config.speed_snap { 0.0 } else { raw };

        self.smoothed = config.speed_alpha * raw + (1.0 - config.speed_alpha) * self.smoothed;
        if self.smoothed < config.speed_snap {
            self.smoothed = 0.0;
        }

        self.samples.push(raw);
        self.last_image = image;
        self.last_world = world;

        raw
    }

    #[inline]
    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    #[inline]
    pub fn samples(&self) -> &CircularQueue<f32> {
        &self.samples
    }

    /// True when the least-squares slope of the recent raw samples is negative.
    pub fn decelerating(&self) -> bool {
        let samples: Vec<f32> = self.samples.asc_iter().copied().collect();

        math::trend(&samples).map_or(false, |slope| slope < -TREND_EPSILON)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Stopped,
    Slowed,
    Moving,
}

/// Stop/move speed limits for one object size.
///
/// Large objects cover more pixels per metre travelled, so their limits are
/// scaled down by the tier factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedThresholds {
    pub stop: f32,
    pub moving: f32,
}

impl SpeedThresholds {
    pub fn for_area(area: f32, config: &Config) -> Self {
        let factor = if area < config.small_area {
            1.0
        } else if area < config.large_area {
            config.medium_tier_factor
        } else {
            config.large_tier_factor
        };

        Self {
            stop: config.stop_speed * factor,
            moving: config.move_speed * factor,
        }
    }

    pub fn classify(&self, speed: f32) -> Motion {
        if speed < self.stop {
            Motion::Stopped
        } else if speed > self.moving {
            Motion::Moving
        } else {
            Motion::Slowed
        }
    }
}
