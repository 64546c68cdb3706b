use serde_derive::{Deserialize, Serialize};
use std::sync::Arc;

use crate::frame::FrameImage;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Trash seen moving away from the vehicle.
    ThrowDetected,
    /// Trash depth jumped while next to the vehicle.
    DepthConfirmedDisposal,
    /// Strong optical flow at the trash location.
    FlowDetectedThrow,
    /// Vehicle stood next to trash, then drove off without it.
    StoppedDisposal,
    /// Vehicle slowed next to trash, then drove off without it.
    MovingThrow,
}

/// A recorded disposal. Never modified after it is emitted.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Event {
    pub frame: u64,
    // seconds since the start of the stream
    pub timestamp: f64,
    pub vehicle_id: u32,
    pub trash_id: Option<u32>,
    #[serde(rename = "event_type")]
    pub kind: EventKind,
    pub location: [f32; 2],
    pub velocity: f32,
    pub review_needed: bool,
    #[serde(skip)]
    pub evidence: Vec<Arc<FrameImage>>,
}
