//! End-to-end disposal scenarios driven through the public monitor API.

use std::sync::Arc;

use approx::assert_relative_eq;
use disposal_watch::bbox::BBox;
use disposal_watch::frame::{FlowField, FrameImage};
use disposal_watch::{
    Config, Detection, DisposalMonitor, EventKind, Frame, Monitoring, ObjectKind, VehicleState,
};
use ndarray::Array3;

const SRC: &str = "cam-0";
const DIMS: (u32, u32) = (1280, 720);

// 200x100 box, medium size tier
fn vehicle(x: f32, y: f32) -> Detection {
    Detection::new(
        ObjectKind::Vehicle,
        BBox::ltrb(x - 100.0, y - 50.0, x + 100.0, y + 50.0),
        2,
        0.92,
    )
}

fn trash(x: f32, y: f32) -> Detection {
    Detection::new(ObjectKind::Trash, BBox::ltrb(x - 6.0, y - 6.0, x + 6.0, y + 6.0), 39, 0.64)
}

fn image(index: u64) -> Arc<FrameImage> {
    Arc::new(FrameImage {
        index,
        width: DIMS.0,
        height: DIMS.1,
        data: vec![0; 16],
    })
}

fn vehicle_state(monitor: &DisposalMonitor, id: u32) -> Option<VehicleState> {
    monitor
        .tracks(SRC)
        .iter()
        .find(|t| t.track_id == id)
        .and_then(|t| t.state)
}

/// Parks a vehicle at (400, 300) with trash lying at (480, 300) for
/// `min_holding` frames.
fn park_with_trash(monitor: &mut DisposalMonitor) -> u64 {
    let frames = monitor.config().min_holding as u64;

    for f in 0..frames {
        let frame = Frame::new(f, DIMS, vec![vehicle(400.0, 300.0), trash(480.0, 300.0)])
            .with_image(image(f));

        let events = monitor.update(&frame, SRC).unwrap();
        assert!(events.is_empty(), "frame {}: unexpected event", f);
    }

    assert_eq!(vehicle_state(monitor, 1), Some(VehicleState::StoppedUnloading));

    frames
}

#[test]
fn test_stopped_disposal() {
    let config = Config::default();
    let min_disposal = config.min_disposal as u64;
    let mut monitor = DisposalMonitor::new(config).unwrap();

    let start = park_with_trash(&mut monitor);

    let mut emitted = Vec::new();
    for (step, f) in (start..start + min_disposal + 10).enumerate() {
        let x = 400.0 + 10.0 * (step as f32 + 1.0);
        let frame = Frame::new(f, DIMS, vec![vehicle(x, 300.0)]).with_image(image(f));

        let events = monitor.update(&frame, SRC).unwrap();
        if f < start + min_disposal - 1 {
            assert!(events.is_empty(), "frame {}: premature event", f);
        }
        emitted.extend(events);
    }

    assert_eq!(emitted.len(), 1);

    let event = &emitted[0];
    assert_eq!(event.kind, EventKind::StoppedDisposal);
    assert_eq!(event.frame, start + min_disposal - 1);
    assert_eq!(event.vehicle_id, 1);
    assert_eq!(event.trash_id, Some(2));
    assert_eq!(event.location, [400.0, 300.0]);
    assert!(!event.review_needed);
    assert!(event.velocity > 0.0);
    assert_relative_eq!(event.timestamp, event.frame as f64 / 30.0);

    assert_eq!(event.evidence.len(), monitor.config().evidence_frames);
    assert_eq!(event.evidence.last().map(|i| i.index), Some(event.frame));

    assert_eq!(vehicle_state(&monitor, 1), Some(VehicleState::TrashDisposed));
    assert_eq!(monitor.events(SRC).len(), 1);
}

#[test]
fn test_no_disposal_while_vehicle_stays() {
    let mut monitor = DisposalMonitor::new(Config::default()).unwrap();
    let start = park_with_trash(&mut monitor);

    // trash gone but vehicle never drives off
    for f in start..start + 60 {
        let frame = Frame::new(f, DIMS, vec![vehicle(400.0, 300.0)]);
        assert!(monitor.update(&frame, SRC).unwrap().is_empty());
    }

    assert_eq!(vehicle_state(&monitor, 1), Some(VehicleState::StoppedUnloading));
}

#[test]
fn test_throw_detected_on_first_outward_frame() {
    let mut monitor = DisposalMonitor::new(Config::default()).unwrap();
    let start = park_with_trash(&mut monitor);

    // the fourth trajectory sample completing an outward run lands on the
    // third moving frame
    for step in 1..=3u64 {
        let f = start + step - 1;
        let x = 480.0 + 3.0 * step as f32;
        let frame = Frame::new(f, DIMS, vec![vehicle(400.0, 300.0), trash(x, 300.0)]);

        let events = monitor.update(&frame, SRC).unwrap();

        if step < 3 {
            assert!(events.is_empty(), "step {}: fired too early", step);
        } else {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, EventKind::ThrowDetected);
            assert_eq!(events[0].trash_id, Some(2));
            // moving trash keeps landing on fresh sighting keys
            assert!(events[0].review_needed);
        }
    }

    assert_eq!(vehicle_state(&monitor, 1), Some(VehicleState::PotentialThrow));
}

#[test]
fn test_flow_detected_throw() {
    let mut monitor = DisposalMonitor::new(Config::default()).unwrap();
    let start = park_with_trash(&mut monitor);

    let mut field = Array3::<f32>::zeros((DIMS.1 as usize, DIMS.0 as usize, 2));
    field[[300, 480, 0]] = 3.0;
    field[[300, 480, 1]] = 1.0;

    let frame = Frame::new(start, DIMS, vec![vehicle(400.0, 300.0), trash(480.0, 300.0)])
        .with_flow(FlowField::new(field).unwrap());

    let events = monitor.update(&frame, SRC).unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::FlowDetectedThrow);
    assert!(!events[0].review_needed);
    // this frame carried no image, the parked frames did
    assert_eq!(events[0].evidence.len(), start as usize);
}

#[test]
fn test_moving_throw() {
    let config = Config::default();
    let min_throw = config.min_throw as u64;
    let min_disposal = config.min_disposal as u64;
    let mut monitor = DisposalMonitor::new(config).unwrap();

    // a vehicle rolling at 2 px/frame is "slowed" in its size tier
    let mut x = 400.0;
    let mut f = 0;
    while f < min_throw {
        x += 2.0;
        let frame = Frame::new(f, DIMS, vec![vehicle(x, 300.0), trash(x + 80.0, 320.0)]);
        monitor.update(&frame, SRC).unwrap();
        f += 1;
    }

    assert_eq!(vehicle_state(&monitor, 1), Some(VehicleState::SlowingThrow));

    let mut emitted = Vec::new();
    for _ in 0..min_disposal {
        x += 10.0;
        let frame = Frame::new(f, DIMS, vec![vehicle(x, 300.0)]);
        emitted.extend(monitor.update(&frame, SRC).unwrap());
        f += 1;
    }

    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].kind, EventKind::MovingThrow);
    assert!(emitted[0].review_needed);
}

#[test]
fn test_episode_rearms_after_quiet_period() {
    let config = Config::default();
    let min_disposal = config.min_disposal as u64;
    let mut monitor = DisposalMonitor::new(config).unwrap();
    let start = park_with_trash(&mut monitor);

    let mut f = start;
    let mut x = 400.0;
    for _ in 0..min_disposal {
        x += 10.0;
        monitor
            .update(&Frame::new(f, DIMS, vec![vehicle(x, 300.0)]), SRC)
            .unwrap();
        f += 1;
    }
    assert_eq!(vehicle_state(&monitor, 1), Some(VehicleState::TrashDisposed));

    for _ in 0..min_disposal {
        x += 10.0;
        monitor
            .update(&Frame::new(f, DIMS, vec![vehicle(x, 300.0)]), SRC)
            .unwrap();
        f += 1;
    }
    assert_eq!(vehicle_state(&monitor, 1), Some(VehicleState::Idle));
    assert_eq!(monitor.events(SRC).len(), 1);
}
