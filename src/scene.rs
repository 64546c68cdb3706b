use std::collections::BTreeMap;
use std::sync::Arc;

use crate::association::{self, Assignment, Candidate};
use crate::behavior::{Observation, TrashObservation};
use crate::circular_queue::CircularQueue;
use crate::config::Config;
use crate::detection::{Detection, DisposalContext, ObjectKind};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::frame::{Frame, FrameImage};
use crate::sightings::{self, SightingRegistry};
use crate::store::TrackStore;
use crate::track::Track;
use crate::velocity::{CameraModel, SpeedThresholds};

use tracing::{debug, info, warn};

const KINDS: [ObjectKind; 3] = [ObjectKind::Vehicle, ObjectKind::Trash, ObjectKind::Bin];

/// Everything one camera stream owns: its tracks, sightings, evidence
/// buffer and the events recorded so far.
pub struct Scene {
    config: Config,
    store: TrackStore,
    sightings: SightingRegistry,
    evidence: CircularQueue<Arc<FrameImage>>,
    events: Vec<Event>,
    last_frame: Option<u64>,
}

impl Scene {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            store: TrackStore::new(config),
            sightings: SightingRegistry::new(
                config.sighting_quantum,
                config.confirmation_threshold,
                config.max_inactive,
            ),
            evidence: CircularQueue::with_capacity(config.evidence_frames),
            events: Vec::new(),
            last_frame: None,
        }
    }

    /// Runs one frame through the pipeline and returns the events it produced.
    ///
    /// The frame is validated as a whole before any state changes, so a
    /// rejected frame leaves the scene untouched.
    pub fn update(&mut self, frame: &Frame) -> Result<Vec<Event>> {
        if let Some(last) = self.last_frame {
            if frame.index <= last {
                return Err(Error::FrameOutOfOrder {
                    last,
                    got: frame.index,
                });
            }
        }

        frame.validate()?;

        let index = frame.index;
        let fps = frame.fps.unwrap_or(self.config.fps);
        let camera = CameraModel::new(frame.dims, &self.config).with_fps(fps);
        let detections = self.prepare(frame);

        self.last_frame = Some(index);

        let evicted = self.store.evict(index);
        if evicted > 0 {
            debug!(frame = index, evicted, "evicted stale tracks");
        }

        if let Some(image) = &frame.image {
            self.evidence.push(image.clone());
        }

        for kind in KINDS {
            self.associate(kind, &detections, index, &camera)?;
        }

        let attribution = self.attribute(index);
        let observations = self.observe(frame, &attribution)?;

        let mut emitted = Vec::new();

        for (id, obs) in observations {
            let track = self.store.get_mut(id)?;
            let velocity = track.velocity();

            let Some(emission) = track
                .behavior_mut()
                .and_then(|b| b.step(id, &obs, &self.config))
            else {
                continue;
            };

            info!(
                frame = index,
                vehicle = id,
                trash = ?emission.trash_id,
                kind = ?emission.kind,
                review = emission.review_needed,
                "disposal event"
            );

            emitted.push(Event {
                frame: index,
                timestamp: index as f64 / fps as f64,
                vehicle_id: id,
                trash_id: emission.trash_id,
                kind: emission.kind,
                location: [emission.location.x, emission.location.y],
                velocity,
                review_needed: emission.review_needed,
                evidence: self.evidence.asc_iter().cloned().collect(),
            });
        }

        self.events.extend(emitted.iter().cloned());

        Ok(emitted)
    }

    /// Copies the frame's detections, fills missing depth from the depth map
    /// and annotates trash.
    fn prepare(&mut self, frame: &Frame) -> Vec<Detection> {
        let mut detections = frame.detections.clone();

        if let Some(map) = &frame.depth {
            for det in detections.iter_mut().filter(|d| d.depth.is_none()) {
                let c = det.bbox.center();
                det.depth = map.at(c.x, c.y);
            }
        }

        sightings::annotate(
            &mut detections,
            &mut self.sightings,
            self.config.bin_radius,
            frame.index,
        );

        detections
    }

    fn associate(
        &mut self,
        kind: ObjectKind,
        detections: &[Detection],
        index: u64,
        camera: &CameraModel,
    ) -> Result<()> {
        let dets: Vec<&Detection> = detections.iter().filter(|d| d.kind == kind).collect();

        if dets.is_empty() {
            return Ok(());
        }

        let (ids, centers): (Vec<u32>, Vec<_>) =
            self.store.query(kind).map(|t| (t.id, t.center())).unzip();

        let assignment = if ids.is_empty() {
            Assignment::unmatched(dets.len(), 0)
        } else {
            let det_centers: Vec<_> = dets.iter().map(|d| d.center()).collect();

            match association::associate(&det_centers, &centers, self.config.distance_threshold) {
                Ok(a) => a,
                Err(err) => {
                    warn!(frame = index, ?kind, %err, "association failed, spawning new tracks");
                    Assignment::unmatched(dets.len(), ids.len())
                }
            }
        };

        for &(d, t, _) in &assignment.matched {
            self.store.upsert(Some(ids[t]), dets[d], index, camera)?;
        }

        for &d in &assignment.unmatched_detections {
            self.store.upsert(None, dets[d], index, camera)?;
        }

        Ok(())
    }

    /// Pairs recently seen vehicles with the improper trash seen in this frame.
    fn attribute(&self, index: u64) -> BTreeMap<u32, u32> {
        let horizon = self.config.attribution_horizon;

        let vehicles: Vec<_> = self
            .store
            .query(ObjectKind::Vehicle)
            .filter(|t| index.saturating_sub(t.last_seen) <= horizon)
            .map(|t| Candidate {
                id: t.id,
                center: t.center(),
                area: t.bbox.area(),
            })
            .collect();

        let trash: Vec<_> = self
            .store
            .query(ObjectKind::Trash)
            .filter(|t| t.last_seen == index)
            .filter(|t| {
                t.trash()
                    .map_or(false, |h| h.context == DisposalContext::Improper)
            })
            .map(|t| Candidate {
                id: t.id,
                center: t.center(),
                area: t.bbox.area(),
            })
            .collect();

        match association::cross_associate(&vehicles, &trash, &self.config) {
            Ok(map) => map,
            Err(err) => {
                warn!(frame = index, %err, "trash attribution failed");
                BTreeMap::new()
            }
        }
    }

    fn observe(
        &self,
        frame: &Frame,
        attribution: &BTreeMap<u32, u32>,
    ) -> Result<Vec<(u32, Observation)>> {
        let mut observations = Vec::new();

        for vehicle in self.store.query(ObjectKind::Vehicle) {
            let position = vehicle.center().point();
            let thresholds = SpeedThresholds::for_area(vehicle.mean_area(), &self.config);

            let trash = match attribution.get(&vehicle.id) {
                Some(&trash_id) => {
                    let track = self.store.get(trash_id)?;

                    track.trash().map(|history| {
                        let at = track.center().point();

                        TrashObservation {
                            id: trash_id,
                            status: history.status,
                            outward: history
                                .moving_away_from(&position, self.config.min_trajectory),
                            depth_jump: history.depth_jump(self.config.depth_change_threshold),
                            flow_magnitude: frame
                                .flow
                                .as_ref()
                                .and_then(|f| f.magnitude_at(at.x, at.y)),
                        }
                    })
                }
                None => None,
            };

            observations.push((
                vehicle.id,
                Observation {
                    position,
                    motion: thresholds.classify(vehicle.velocity()),
                    decelerating: vehicle.kinematics.decelerating(),
                    trash,
                },
            ));
        }

        Ok(observations)
    }

    /// Snapshot of every live track, in identity order.
    pub fn tracks(&self) -> Vec<Track> {
        let now = self.last_frame.unwrap_or(0);

        self.store.iter().map(|t| t.snapshot(now)).collect()
    }

    #[inline]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[inline]
    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    #[inline]
    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }
}
