use serde_derive::{Deserialize, Serialize};

use crate::behavior::VehicleState;
use crate::bbox::{BBox, Xywh};
use crate::detection::ObjectKind;

/// Read-only view of a live track, handed out for rendering.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: u32,
    pub kind: ObjectKind,
    pub bbox: BBox<Xywh>,

    // vehicles only
    pub state: Option<VehicleState>,

    // smoothed, see velocity module for units
    pub velocity: f32,

    pub last_seen: u64,
    pub time_since_update: u64,
}
