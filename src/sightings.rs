//! Trash annotation: bin-proximity context and sighting-based confirmation.

use crate::detection::{Confirmation, Detection, DisposalContext, ObjectKind};
use nalgebra as na;
use std::collections::HashMap;

/// Counts how often each quantized trash box has been seen.
///
/// Keys are the box corners snapped to a `quantum` pixel grid, so a piece of
/// trash lying still produces the same key frame after frame while a moving
/// one keeps producing fresh keys. A key unseen for more than `horizon`
/// frames is forgotten.
#[derive(Debug)]
pub struct SightingRegistry {
    quantum: f32,
    threshold: u32,
    horizon: u64,
    counts: HashMap<[i32; 4], (u32, u64)>,
}

impl SightingRegistry {
    pub fn new(quantum: f32, threshold: u32, horizon: u64) -> Self {
        Self {
            quantum,
            threshold,
            horizon,
            counts: HashMap::new(),
        }
    }

    pub fn sight(&mut self, det: &Detection, frame: u64) -> Confirmation {
        let (count, last_seen) = self
            .counts
            .entry(det.bbox.quantized(self.quantum))
            .or_insert((0, frame));
        *count += 1;
        *last_seen = frame;

        if *count >= self.threshold {
            Confirmation::Confirmed
        } else {
            Confirmation::Potential
        }
    }

    /// Drops keys unseen for more than the horizon, returns how many.
    pub fn expire(&mut self, frame: u64) -> usize {
        let horizon = self.horizon;
        let before = self.counts.len();

        self.counts
            .retain(|_, (_, last_seen)| frame.saturating_sub(*last_seen) <= horizon);

        before - self.counts.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Trash is proper when some bin center lies closer than `radius`.
pub fn classify_context(
    trash: &na::Point2<f32>,
    bins: &[na::Point2<f32>],
    radius: f32,
) -> DisposalContext {
    let nearest = bins
        .iter()
        .map(|b| na::distance(trash, b))
        .fold(f32::INFINITY, f32::min);

    if nearest < radius {
        DisposalContext::Proper
    } else {
        DisposalContext::Improper
    }
}

/// Fills `context` and `status` of every trash detection in the frame.
pub fn annotate(
    detections: &mut [Detection],
    registry: &mut SightingRegistry,
    bin_radius: f32,
    frame: u64,
) {
    registry.expire(frame);

    let bins: Vec<_> = detections
        .iter()
        .filter(|d| d.kind == ObjectKind::Bin)
        .map(|d| d.bbox.center())
        .collect();

    for det in detections.iter_mut().filter(|d| d.kind == ObjectKind::Trash) {
        det.status = registry.sight(det, frame);
        det.context = classify_context(&det.bbox.center(), &bins, bin_radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    fn trash_at(x: f32, y: f32) -> Detection {
        Detection::new(ObjectKind::Trash, BBox::ltrb(x - 5.0, y - 5.0, x + 5.0, y + 5.0), 0, 0.6)
    }

    fn bin_at(x: f32, y: f32) -> Detection {
        Detection::new(ObjectKind::Bin, BBox::ltrb(x - 10.0, y - 10.0, x + 10.0, y + 10.0), 3, 0.9)
    }

    #[test]
    fn test_confirmed_after_threshold() {
        let mut registry = SightingRegistry::new(1.0, 3, 30);
        let t = trash_at(100.0, 100.0);

        assert_eq!(registry.sight(&t, 0), Confirmation::Potential);
        assert_eq!(registry.sight(&t, 1), Confirmation::Potential);
        assert_eq!(registry.sight(&t, 2), Confirmation::Confirmed);
        assert_eq!(registry.sight(&t, 3), Confirmation::Confirmed);
    }

    #[test]
    fn test_moving_trash_stays_potential() {
        let mut registry = SightingRegistry::new(1.0, 3, 30);

        for i in 0..5 {
            let t = trash_at(100.0 + 4.0 * i as f32, 100.0);
            assert_eq!(registry.sight(&t, i), Confirmation::Potential);
        }
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_stale_keys_expire() {
        let mut registry = SightingRegistry::new(1.0, 3, 30);

        for f in 0..1000u64 {
            let mut dets = vec![trash_at(f as f32, 100.0)];
            annotate(&mut dets, &mut registry, 50.0, f);

            assert!(registry.len() <= 31, "frame {}: {} keys", f, registry.len());
        }

        assert_eq!(registry.expire(1029), 30);
        assert_eq!(registry.expire(1030), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_expired_key_starts_over() {
        let mut registry = SightingRegistry::new(1.0, 3, 30);
        let t = trash_at(100.0, 100.0);

        for f in 0..3 {
            registry.sight(&t, f);
        }
        assert_eq!(registry.sight(&t, 40), Confirmation::Confirmed);

        registry.expire(71);
        assert_eq!(registry.sight(&t, 71), Confirmation::Potential);
    }

    #[test]
    fn test_context_without_bins_is_improper() {
        let p = na::Point2::new(0.0, 0.0);

        assert_eq!(classify_context(&p, &[], 50.0), DisposalContext::Improper);
    }

    #[test]
    fn test_context_near_bin_is_proper() {
        let mut dets = vec![trash_at(100.0, 100.0), bin_at(130.0, 100.0), trash_at(400.0, 100.0)];
        let mut registry = SightingRegistry::new(1.0, 3, 30);

        annotate(&mut dets, &mut registry, 50.0, 0);

        assert_eq!(dets[0].context, DisposalContext::Proper);
        assert_eq!(dets[2].context, DisposalContext::Improper);
        assert_eq!(dets[1].status, Confirmation::Potential);
        assert_eq!(registry.len(), 2);
    }
}
