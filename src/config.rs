use crate::error::{Error, Result};
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

/// Every tunable of a monitoring scene.
///
/// Distances are in image pixels, windows and horizons in frames. Speed
/// thresholds are in whatever unit the velocity estimator yields for the
/// stream: metres per second when depth is available, pixels per frame
/// otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    // association
    pub distance_threshold: f32,
    pub max_inactive: u64,

    // history capacities
    pub center_history: usize,
    pub area_history: usize,
    pub speed_history: usize,
    pub depth_history: usize,
    pub trajectory_history: usize,

    // trash annotation
    pub bin_radius: f32,
    pub confirmation_threshold: u32,
    pub sighting_quantum: f32,

    // velocity
    pub fps: f32,
    pub fov_deg: f32,
    pub reference_area: f32,
    pub reference_depth: f32,
    pub reference_distance: f32,
    pub speed_snap: f32,
    pub speed_alpha: f32,

    // size tiers
    pub small_area: f32,
    pub large_area: f32,
    pub stop_speed: f32,
    pub move_speed: f32,
    pub medium_tier_factor: f32,
    pub large_tier_factor: f32,

    // behaviour
    pub proximity_factor: f32,
    // vehicles unseen for longer take no trash
    pub attribution_horizon: u64,
    pub max_depth_gap: f32,
    pub proximity_window: usize,
    pub throw_window: usize,
    pub min_holding: usize,
    pub min_throw: usize,
    pub min_disposal: u32,
    pub min_trajectory: usize,
    pub depth_change_threshold: f32,
    pub flow_threshold: f32,

    // evidence and export
    pub evidence_frames: usize,
    pub interpolation_gap: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            distance_threshold: 150.0,
            max_inactive: 30,

            center_history: 30,
            area_history: 5,
            speed_history: 5,
            depth_history: 10,
            trajectory_history: 10,

            bin_radius: 50.0,
            confirmation_threshold: 3,
            sighting_quantum: 1.0,

            fps: 30.0,
            fov_deg: 60.0,
            reference_area: 10_000.0,
            reference_depth: 0.5,
            reference_distance: 10.0,
            speed_snap: 0.1,
            speed_alpha: 0.3,

            small_area: 5_000.0,
            large_area: 40_000.0,
            stop_speed: 1.0,
            move_speed: 3.0,
            medium_tier_factor: 0.75,
            large_tier_factor: 0.5,

            proximity_factor: 1.0,
            attribution_horizon: 5,
            max_depth_gap: 0.25,
            proximity_window: 30,
            throw_window: 5,
            min_holding: 15,
            min_throw: 5,
            min_disposal: 20,
            min_trajectory: 4,
            depth_change_threshold: 0.1,
            flow_threshold: 2.0,

            evidence_frames: 30,
            interpolation_gap: 5,
        }
    }
}

impl Config {
    pub fn from_yaml_str(src: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(src)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("distance_threshold", self.distance_threshold),
            ("bin_radius", self.bin_radius),
            ("sighting_quantum", self.sighting_quantum),
            ("fps", self.fps),
            ("reference_area", self.reference_area),
            ("reference_depth", self.reference_depth),
            ("reference_distance", self.reference_distance),
            ("stop_speed", self.stop_speed),
            ("proximity_factor", self.proximity_factor),
            ("max_depth_gap", self.max_depth_gap),
            ("depth_change_threshold", self.depth_change_threshold),
            ("flow_threshold", self.flow_threshold),
            ("medium_tier_factor", self.medium_tier_factor),
            ("large_tier_factor", self.large_tier_factor),
        ];

        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{} must be positive, got {}", name, value));
            }
        }

        let capacities = [
            ("center_history", self.center_history),
            ("area_history", self.area_history),
            ("speed_history", self.speed_history),
            ("depth_history", self.depth_history),
            ("trajectory_history", self.trajectory_history),
            ("proximity_window", self.proximity_window),
            ("throw_window", self.throw_window),
        ];

        for (name, value) in capacities {
            if value == 0 {
                return invalid(format!("{} must hold at least one sample", name));
            }
        }

        if self.speed_snap < 0.0 {
            return invalid(format!("speed_snap must not be negative, got {}", self.speed_snap));
        }

        if !(self.speed_alpha > 0.0 && self.speed_alpha <= 1.0) {
            return invalid(format!("speed_alpha must be in (0, 1], got {}", self.speed_alpha));
        }

        if !(self.fov_deg > 0.0 && self.fov_deg < 180.0) {
            return invalid(format!("fov_deg must be in (0, 180), got {}", self.fov_deg));
        }

        if self.move_speed < self.stop_speed {
            return invalid("move_speed must not be below stop_speed".to_string());
        }

        if !(self.small_area > 0.0 && self.small_area < self.large_area) {
            return invalid("size tiers must satisfy 0 < small_area < large_area".to_string());
        }

        if self.min_holding == 0 || self.min_holding > self.proximity_window {
            return invalid(format!(
                "min_holding ({}) must be in 1..={} (proximity_window)",
                self.min_holding, self.proximity_window
            ));
        }

        if self.min_throw == 0 || self.min_throw > self.throw_window {
            return invalid(format!(
                "min_throw ({}) must be in 1..={} (throw_window)",
                self.min_throw, self.throw_window
            ));
        }

        if self.min_trajectory < 2 || self.min_trajectory > self.trajectory_history {
            return invalid(format!(
                "min_trajectory ({}) must be in 2..={} (trajectory_history)",
                self.min_trajectory, self.trajectory_history
            ));
        }

        if self.attribution_horizon > self.max_inactive {
            return invalid(format!(
                "attribution_horizon ({}) must not exceed max_inactive ({})",
                self.attribution_horizon, self.max_inactive
            ));
        }

        if self.min_disposal == 0 || self.confirmation_threshold == 0 {
            return invalid("min_disposal and confirmation_threshold must be non-zero".to_string());
        }

        Ok(())
    }
}

fn invalid(msg: String) -> Result<()> {
    Err(Error::InvalidConfig(msg))
}
