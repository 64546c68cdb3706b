//! Detection to track correspondence.
//!
//! Both assignment problems of a frame go through [`solve`]: the primary one
//! matching detections of a kind to tracks of that kind, and the smaller
//! secondary one attributing trash to vehicles.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::detection::Center;
use crate::error::{Error, Result};

use munkres::{solve_assignment, WeightMatrix};
use nalgebra as na;

/// Outcome of one assignment solve. Indices refer to the rows (detections)
/// and columns (tracks) of the cost matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    pub matched: Vec<(usize, usize, f32)>,
    pub unmatched_detections: Vec<usize>,
    pub unmatched_tracks: Vec<usize>,
}

impl Assignment {
    pub(crate) fn unmatched(rows: usize, cols: usize) -> Self {
        Self {
            matched: Vec::new(),
            unmatched_detections: (0..rows).collect(),
            unmatched_tracks: (0..cols).collect(),
        }
    }
}

/// Minimum total cost pairing of rows with columns.
///
/// Non-finite entries mark forbidden pairs. The matrix is padded to a square
/// for the solver; pairs landing in padding, on a forbidden entry or failing
/// `accept` are dropped and leave both sides unmatched. Matches come out
/// ordered by row.
pub fn solve<A>(costs: &na::DMatrix<f32>, accept: A) -> Result<Assignment>
where
    A: Fn(f32) -> bool,
{
    let (rows, cols) = costs.shape();

    if rows == 0 || cols == 0 {
        return Ok(Assignment::unmatched(rows, cols));
    }

    let n = rows.max(cols);

    let max_finite = costs
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .fold(0.0f32, f32::max);
    let blocked = max_finite * 2.0 + 1.0;

    let mut weights = WeightMatrix::from_fn(n, |(r, c)| {
        if r < rows && c < cols {
            let cost = costs[(r, c)];
            if cost.is_finite() {
                cost
            } else {
                blocked
            }
        } else {
            blocked
        }
    });

    let positions = solve_assignment(&mut weights).map_err(|_| Error::Assignment(n))?;

    let mut matched: Vec<_> = positions
        .into_iter()
        .filter(|p| p.row < rows && p.column < cols)
        .map(|p| (p.row, p.column, costs[(p.row, p.column)]))
        .filter(|&(_, _, cost)| cost.is_finite() && accept(cost))
        .collect();

    matched.sort_by_key(|&(r, _, _)| r);

    let unmatched_detections = (0..rows)
        .filter(|r| !matched.iter().any(|&(mr, _, _)| mr == *r))
        .collect();
    let unmatched_tracks = (0..cols)
        .filter(|c| !matched.iter().any(|&(_, mc, _)| mc == *c))
        .collect();

    Ok(Assignment {
        matched,
        unmatched_detections,
        unmatched_tracks,
    })
}

/// Matches detection centers to the latest centers of same-kind tracks.
///
/// A pair is kept when its distance (3D when both sides carry depth) is
/// below `threshold`.
pub fn associate(detections: &[Center], tracks: &[Center], threshold: f32) -> Result<Assignment> {
    let costs = na::DMatrix::from_fn(detections.len(), tracks.len(), |i, j| {
        detections[i].distance(&tracks[j])
    });

    solve(&costs, |cost| cost < threshold)
}

/// A party of the trash to vehicle match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: u32,
    pub center: Center,
    pub area: f32,
}

/// Attributes each trash to at most one vehicle and each vehicle to at most
/// one trash.
///
/// A trash is reachable from a vehicle when its image-plane distance stays
/// within `proximity_factor * sqrt(vehicle area)` and, when both carry depth,
/// their depths differ by no more than `max_depth_gap`. Returns vehicle id to
/// trash id.
pub fn cross_associate(
    vehicles: &[Candidate],
    trash: &[Candidate],
    config: &Config,
) -> Result<BTreeMap<u32, u32>> {
    let costs = na::DMatrix::from_fn(vehicles.len(), trash.len(), |i, j| {
        let vehicle = &vehicles[i];
        let item = &trash[j];

        let radius = config.proximity_factor * vehicle.area.max(0.0).sqrt();
        let dist = na::distance(&vehicle.center.point(), &item.center.point());

        let depth_ok = match (vehicle.center.depth, item.center.depth) {
            (Some(a), Some(b)) => (a - b).abs() <= config.max_depth_gap,
            _ => true,
        };

        if dist <= radius && depth_ok {
            dist
        } else {
            f32::INFINITY
        }
    });

    let assignment = solve(&costs, |_| true)?;

    Ok(assignment
        .matched
        .into_iter()
        .map(|(v, t, _)| (vehicles[v].id, trash[t].id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(x: f32, y: f32) -> Center {
        Center::new(x, y, None)
    }

    #[test]
    fn test_optimal_beats_greedy() {
        // greedy would pair det 0 with track 0 (cost 1) and leave det 1 with
        // track 1 (cost 10); the optimum is 2 + 2
        let costs = na::DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 10.0]);

        let res = solve(&costs, |_| true).unwrap();

        assert_eq!(res.matched.len(), 2);
        assert_eq!((res.matched[0].0, res.matched[0].1), (0, 1));
        assert_eq!((res.matched[1].0, res.matched[1].1), (1, 0));
        assert_relative_eq!(res.matched.iter().map(|m| m.2).sum::<f32>(), 4.0);
    }

    #[test]
    fn test_gate_leaves_both_sides_unmatched() {
        let dets = [c(0.0, 0.0), c(500.0, 0.0)];
        let tracks = [c(3.0, 4.0)];

        let res = associate(&dets, &tracks, 150.0).unwrap();

        assert_eq!(res.matched, vec![(0, 0, 5.0)]);
        assert_eq!(res.unmatched_detections, vec![1]);
        assert!(res.unmatched_tracks.is_empty());

        let res = associate(&dets[1..], &tracks, 150.0).unwrap();
        assert!(res.matched.is_empty());
        assert_eq!(res.unmatched_detections, vec![0]);
        assert_eq!(res.unmatched_tracks, vec![0]);
    }

    #[test]
    fn test_gate_is_strict() {
        let res = associate(&[c(150.0, 0.0)], &[c(0.0, 0.0)], 150.0).unwrap();

        assert!(res.matched.is_empty());
    }

    #[test]
    fn test_depth_enters_distance() {
        let det = [Center::new(0.0, 0.0, Some(3.0))];
        let track = [Center::new(0.0, 4.0, Some(0.0))];

        let res = associate(&det, &track, 150.0).unwrap();

        assert_relative_eq!(res.matched[0].2, 5.0);
    }

    #[test]
    fn test_empty_sides() {
        let res = associate(&[], &[c(0.0, 0.0)], 150.0).unwrap();
        assert!(res.matched.is_empty());
        assert_eq!(res.unmatched_tracks, vec![0]);

        let res = associate(&[c(0.0, 0.0), c(1.0, 1.0)], &[], 150.0).unwrap();
        assert_eq!(res.unmatched_detections, vec![0, 1]);
    }

    #[test]
    fn test_forbidden_pairs_never_matched() {
        let inf = f32::INFINITY;
        let costs = na::DMatrix::from_row_slice(2, 2, &[inf, inf, 1.0, f32::NAN]);

        let res = solve(&costs, |_| true).unwrap();

        assert_eq!(res.matched, vec![(1, 0, 1.0)]);
        assert_eq!(res.unmatched_detections, vec![0]);
        assert_eq!(res.unmatched_tracks, vec![1]);
    }

    #[test]
    fn test_deterministic() {
        let dets: Vec<_> = (0..6).map(|i| c(i as f32 * 20.0, 0.0)).collect();
        let tracks: Vec<_> = (0..5).map(|i| c(i as f32 * 20.0 + 10.0, 0.0)).collect();

        let first = associate(&dets, &tracks, 150.0).unwrap();
        for _ in 0..10 {
            assert_eq!(associate(&dets, &tracks, 150.0).unwrap(), first);
        }
    }

    #[test]
    fn test_cross_association_gates() {
        let config = Config::default();
        let vehicle = Candidate {
            id: 1,
            center: Center::new(100.0, 100.0, Some(0.5)),
            area: 10_000.0,
        };

        let near = Candidate {
            id: 7,
            center: Center::new(160.0, 100.0, Some(0.6)),
            area: 100.0,
        };
        let far = Candidate {
            id: 8,
            center: Center::new(250.0, 100.0, None),
            area: 100.0,
        };
        let deep = Candidate {
            id: 9,
            center: Center::new(110.0, 100.0, Some(0.9)),
            area: 100.0,
        };

        let map = cross_associate(&[vehicle], &[far, deep, near], &config).unwrap();

        assert_eq!(map.get(&1), Some(&7));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_cross_association_is_one_to_one() {
        let config = Config::default();
        let v1 = Candidate {
            id: 1,
            center: c(100.0, 100.0),
            area: 10_000.0,
        };
        let v2 = Candidate {
            id: 2,
            center: c(200.0, 100.0),
            area: 10_000.0,
        };
        let trash = Candidate {
            id: 5,
            center: c(140.0, 100.0),
            area: 50.0,
        };

        let map = cross_associate(&[v1, v2], &[trash], &config).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&5));
    }
}
