use std::collections::BTreeMap;

use crate::behavior::{VehicleBehavior, VehicleState};
use crate::bbox::{BBox, Ltrb};
use crate::circular_queue::CircularQueue;
use crate::config::Config;
use crate::detection::{Center, Confirmation, Detection, DisposalContext, ObjectKind};
use crate::error::{Error, Result};
use crate::math;
use crate::track::Track;
use crate::velocity::{CameraModel, Kinematics};

use nalgebra as na;
use tracing::debug;

/// Depth and image-plane history of a trash track.
#[derive(Debug, Clone)]
pub struct TrashHistory {
    pub depths: CircularQueue<f32>,
    pub trajectory: CircularQueue<na::Point2<f32>>,
    pub context: DisposalContext,
    pub status: Confirmation,
}

impl TrashHistory {
    fn new(det: &Detection, config: &Config) -> Self {
        let mut depths = CircularQueue::with_capacity(config.depth_history);
        if let Some(depth) = det.depth {
            depths.push(depth);
        }

        Self {
            depths,
            trajectory: CircularQueue::singleton(config.trajectory_history, det.bbox.center()),
            context: det.context,
            status: det.status,
        }
    }

    fn record(&mut self, det: &Detection) {
        if let Some(depth) = det.depth {
            self.depths.push(depth);
        }

        self.trajectory.push(det.bbox.center());
        self.context = det.context;
        self.status = det.status;
    }

    /// Every step over the last `samples` positions points away from `origin`.
    pub fn moving_away_from(&self, origin: &na::Point2<f32>, samples: usize) -> bool {
        if samples < 2 || self.trajectory.len() < samples {
            return false;
        }

        let Some(current) = self.trajectory.latest() else {
            return false;
        };
        let direction = current - origin;

        let recent: Vec<_> = self.trajectory.recent(samples).collect();

        recent
            .windows(2)
            .all(|w| (w[1] - w[0]).dot(&direction) > 0.0)
    }

    /// Last two depth samples differ by more than `threshold`.
    pub fn depth_jump(&self, threshold: f32) -> bool {
        match (self.depths.latest(), self.depths.previous()) {
            (Some(curr), Some(prev)) => (curr - prev).abs() > threshold,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Role {
    Vehicle(VehicleBehavior),
    Trash(TrashHistory),
    Bin,
}

/// A tracked object with its bounded histories.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: u32,
    pub kind: ObjectKind,
    pub bbox: BBox<Ltrb>,
    pub centers: CircularQueue<(u64, Center)>,
    pub areas: CircularQueue<f32>,
    pub kinematics: Kinematics,
    pub last_seen: u64,
    pub role: Role,
}

impl Participant {
    pub fn new(
        id: u32,
        frame: u64,
        det: &Detection,
        camera: &CameraModel,
        config: &Config,
    ) -> Self {
        let center = det.center();
        let area = det.area();

        let role = match det.kind {
            ObjectKind::Vehicle => Role::Vehicle(VehicleBehavior::new(config)),
            ObjectKind::Trash => Role::Trash(TrashHistory::new(det, config)),
            ObjectKind::Bin => Role::Bin,
        };

        Self {
            id,
            kind: det.kind,
            bbox: det.bbox,
            centers: CircularQueue::singleton(config.center_history, (frame, center)),
            areas: CircularQueue::singleton(config.area_history, area),
            kinematics: Kinematics::new(config.speed_history, camera, &center, area),
            last_seen: frame,
            role,
        }
    }

    pub fn update(&mut self, frame: u64, det: &Detection, camera: &CameraModel, config: &Config) {
        let center = det.center();
        let area = det.area();

        self.bbox = det.bbox;
        self.centers.push((frame, center));
        self.areas.push(area);
        self.last_seen = frame;
        self.kinematics.observe(camera, &center, area, config);

        if let Role::Trash(history) = &mut self.role {
            history.record(det);
        }
    }

    pub fn center(&self) -> Center {
        match self.centers.latest() {
            Some((_, c)) => *c,
            None => {
                let c = self.bbox.center();
                Center::new(c.x, c.y, None)
            }
        }
    }

    pub fn mean_area(&self) -> f32 {
        self.areas.mean().unwrap_or_else(|| self.bbox.area())
    }

    #[inline]
    pub fn velocity(&self) -> f32 {
        self.kinematics.smoothed()
    }

    pub fn behavior(&self) -> Option<&VehicleBehavior> {
        match &self.role {
            Role::Vehicle(b) => Some(b),
            _ => None,
        }
    }

    pub fn behavior_mut(&mut self) -> Option<&mut VehicleBehavior> {
        match &mut self.role {
            Role::Vehicle(b) => Some(b),
            _ => None,
        }
    }

    pub fn trash(&self) -> Option<&TrashHistory> {
        match &self.role {
            Role::Trash(t) => Some(t),
            _ => None,
        }
    }

    #[inline]
    pub fn state(&self) -> Option<VehicleState> {
        self.behavior().map(VehicleBehavior::state)
    }

    pub fn snapshot(&self, frame: u64) -> Track {
        Track {
            track_id: self.id,
            kind: self.kind,
            bbox: self.bbox.as_xywh(),
            state: self.state(),
            velocity: self.velocity(),
            last_seen: self.last_seen,
            time_since_update: frame.saturating_sub(self.last_seen),
        }
    }
}

/// Owns every live track of one stream.
///
/// Identities come from a per-store counter starting at 1 and are never
/// handed out twice, not even after the track they named was evicted.
#[derive(Debug)]
pub struct TrackStore {
    tracks: BTreeMap<u32, Participant>,
    next_id: u32,
    config: Config,
}

impl TrackStore {
    pub fn new(config: &Config) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 1,
            config: config.clone(),
        }
    }

    /// Extends track `id` with the detection, or opens a new track when `id`
    /// is `None`. Returns the identity of the touched track.
    pub fn upsert(
        &mut self,
        id: Option<u32>,
        det: &Detection,
        frame: u64,
        camera: &CameraModel,
    ) -> Result<u32> {
        match id {
            Some(id) => {
                let track = self.tracks.get_mut(&id).ok_or(Error::UnknownTrack(id))?;

                if track.kind != det.kind {
                    return Err(Error::InvalidDetection(format!(
                        "{:?} detection offered to {:?} track {}",
                        det.kind, track.kind, id
                    )));
                }

                track.update(frame, det, camera, &self.config);

                Ok(id)
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;

                debug!(track = id, kind = ?det.kind, frame, "new track");
                self.tracks
                    .insert(id, Participant::new(id, frame, det, camera, &self.config));

                Ok(id)
            }
        }
    }

    /// Drops every track unseen for more than the inactivity horizon.
    pub fn evict(&mut self, frame: u64) -> usize {
        let horizon = self.config.max_inactive;
        let before = self.tracks.len();

        self.tracks.retain(|id, t| {
            let keep = frame.saturating_sub(t.last_seen) <= horizon;
            if !keep {
                debug!(track = *id, last_seen = t.last_seen, frame, "track evicted");
            }
            keep
        });

        before - self.tracks.len()
    }

    /// Live tracks of one kind, in identity order.
    pub fn query(&self, kind: ObjectKind) -> impl Iterator<Item = &Participant> {
        self.tracks.values().filter(move |t| t.kind == kind)
    }

    pub fn get(&self, id: u32) -> Result<&Participant> {
        self.tracks.get(&id).ok_or(Error::UnknownTrack(id))
    }

    pub fn get_mut(&mut self, id: u32) -> Result<&mut Participant> {
        self.tracks.get_mut(&id).ok_or(Error::UnknownTrack(id))
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.tracks.contains_key(&id)
    }

    /// Center history of a track, oldest first.
    pub fn history(&self, id: u32) -> Result<Vec<(u64, Center)>> {
        Ok(self.get(id)?.centers.asc_iter().copied().collect())
    }

    /// Image-plane path of a track with short gaps filled in.
    pub fn trajectory(&self, id: u32, max_gap: u64) -> Result<Vec<(u64, na::Point2<f32>)>> {
        let samples: Vec<_> = self
            .get(id)?
            .centers
            .asc_iter()
            .map(|(f, c)| (*f, c.point()))
            .collect();

        Ok(math::interpolate_gaps(&samples, max_gap))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.tracks.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
