//! Per-vehicle disposal state machine.
//!
//! ```text
//! IDLE ──stopped & held──────────▶ STOPPED_UNLOADING ─┐
//!      ──slowed & thrown─────────▶ SLOWING_THROW ─────┼──▶ POTENTIAL_THROW
//!      ──slowed & decel & near───▶ DECEL_NEAR_TRASH ──┘    TRASH_DISPOSED
//! ```
//!
//! Terminal states fall back to IDLE after `min_disposal` trash-free frames.

use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::circular_queue::CircularQueue;
use crate::config::Config;
use crate::detection::Confirmation;
use crate::event::EventKind;
use crate::velocity::Motion;
use nalgebra as na;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleState {
    #[default]
    Idle,
    StoppedUnloading,
    SlowingThrow,
    DeceleratingNearTrash,
    PotentialThrow,
    TrashDisposed,
}

/// The trash attributed to a vehicle in the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrashObservation {
    pub id: u32,
    pub status: Confirmation,
    pub outward: bool,
    pub depth_jump: bool,
    pub flow_magnitude: Option<f32>,
}

/// What the state machine sees of its vehicle in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub position: na::Point2<f32>,
    pub motion: Motion,
    pub decelerating: bool,
    pub trash: Option<TrashObservation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub kind: EventKind,
    pub trash_id: Option<u32>,
    pub location: na::Point2<f32>,
    pub review_needed: bool,
}

#[derive(Debug, Clone)]
pub struct VehicleBehavior {
    state: VehicleState,
    proximity: CircularQueue<bool>,
    throw: CircularQueue<bool>,
    no_trash_streak: u32,
    disposal_location: Option<na::Point2<f32>>,
    last_trash: Option<(u32, Confirmation)>,
}

impl VehicleBehavior {
    pub fn new(config: &Config) -> Self {
        Self {
            state: VehicleState::Idle,
            proximity: CircularQueue::with_capacity(config.proximity_window),
            throw: CircularQueue::with_capacity(config.throw_window),
            no_trash_streak: 0,
            disposal_location: None,
            last_trash: None,
        }
    }

    #[inline]
    pub fn state(&self) -> VehicleState {
        self.state
    }

    #[inline]
    pub fn proximity(&self) -> &CircularQueue<bool> {
        &self.proximity
    }

    #[inline]
    pub fn throw_buffer(&self) -> &CircularQueue<bool> {
        &self.throw
    }

    #[inline]
    pub fn no_trash_streak(&self) -> u32 {
        self.no_trash_streak
    }

    #[inline]
    pub fn disposal_location(&self) -> Option<na::Point2<f32>> {
        self.disposal_location
    }

    pub fn step(&mut self, id: u32, obs: &Observation, config: &Config) -> Option<Emission> {
        let near = obs.trash.is_some();

        self.proximity.push(near);
        self.throw.push(near);

        if let Some(trash) = &obs.trash {
            self.last_trash = Some((trash.id, trash.status));
        }

        match self.state {
            VehicleState::Idle => {
                self.arm(id, obs, config);
                None
            }
            VehicleState::StoppedUnloading
            | VehicleState::SlowingThrow
            | VehicleState::DeceleratingNearTrash => self.watch(id, obs, config),
            VehicleState::PotentialThrow | VehicleState::TrashDisposed => {
                self.settle(id, near, config);
                None
            }
        }
    }

    fn arm(&mut self, id: u32, obs: &Observation, config: &Config) {
        let held = self.proximity.count(|&n| n);
        let thrown = self.throw.count(|&n| n);

        let next = match obs.motion {
            Motion::Stopped if held >= config.min_holding => VehicleState::StoppedUnloading,
            Motion::Slowed if thrown >= config.min_throw => VehicleState::SlowingThrow,
            Motion::Slowed if obs.decelerating && obs.trash.is_some() => {
                VehicleState::DeceleratingNearTrash
            }
            _ => return,
        };

        self.transition(id, next);
        self.disposal_location = Some(obs.position);
        self.no_trash_streak = 0;
    }

    fn watch(&mut self, id: u32, obs: &Observation, config: &Config) -> Option<Emission> {
        if let Some(trash) = &obs.trash {
            self.no_trash_streak = 0;

            let flowing = trash
                .flow_magnitude
                .map_or(false, |m| m > config.flow_threshold);

            let (kind, next) = if trash.outward {
                (EventKind::ThrowDetected, VehicleState::PotentialThrow)
            } else if trash.depth_jump {
                (EventKind::DepthConfirmedDisposal, VehicleState::TrashDisposed)
            } else if flowing {
                (EventKind::FlowDetectedThrow, VehicleState::PotentialThrow)
            } else {
                return None;
            };

            return Some(self.emit(id, kind, next, obs));
        }

        self.no_trash_streak += 1;

        if self.no_trash_streak < config.min_disposal {
            return None;
        }

        match self.state {
            VehicleState::StoppedUnloading if obs.motion == Motion::Moving => Some(self.emit(
                id,
                EventKind::StoppedDisposal,
                VehicleState::TrashDisposed,
                obs,
            )),
            VehicleState::SlowingThrow if obs.motion == Motion::Moving => Some(self.emit(
                id,
                EventKind::MovingThrow,
                VehicleState::TrashDisposed,
                obs,
            )),
            VehicleState::DeceleratingNearTrash => {
                self.transition(id, VehicleState::Idle);
                self.no_trash_streak = 0;
                None
            }
            _ => None,
        }
    }

    fn settle(&mut self, id: u32, near: bool, config: &Config) {
        if near {
            self.no_trash_streak = 0;
            return;
        }

        self.no_trash_streak += 1;

        if self.no_trash_streak >= config.min_disposal {
            self.transition(id, VehicleState::Idle);
            self.no_trash_streak = 0;
        }
    }

    fn emit(
        &mut self,
        id: u32,
        kind: EventKind,
        next: VehicleState,
        obs: &Observation,
    ) -> Emission {
        let (trash_id, status) = match self.last_trash {
            Some((trash_id, status)) => (Some(trash_id), status),
            None => (None, Confirmation::Potential),
        };

        let emission = Emission {
            kind,
            trash_id,
            location: self.disposal_location.unwrap_or(obs.position),
            review_needed: status == Confirmation::Potential,
        };

        self.transition(id, next);
        self.no_trash_streak = 0;

        emission
    }

    fn transition(&mut self, id: u32, next: VehicleState) {
        debug!(track = id, from = ?self.state, to = ?next, "vehicle state transition");
        self.state = next;
    }
}
