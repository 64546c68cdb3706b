pub mod association;
pub mod bbox;
pub mod behavior;
pub mod config;
pub mod detection;
pub mod error;
pub mod event;
pub mod frame;
pub mod math;
pub mod scene;
pub mod sightings;
pub mod store;
pub mod velocity;

mod circular_queue;
mod track;

pub use behavior::VehicleState;
pub use circular_queue::CircularQueue;
pub use config::Config;
pub use detection::{Confirmation, Detection, DisposalContext, ObjectKind};
pub use error::{Error, Result};
pub use event::{Event, EventKind};
pub use frame::Frame;
pub use track::Track;

use std::collections::HashMap;
use std::rc::Rc;

pub trait Monitoring {
    /// Feeds one frame of stream `src`, returning the events it produced.
    fn update(&mut self, frame: &Frame, src: &str) -> Result<Vec<Event>>;
    fn tracks(&self, src: &str) -> Rc<[Track]>;
    fn events(&self, src: &str) -> &[Event];
    /// Forgets everything about `src`. The next frame starts a fresh scene.
    fn reset(&mut self, src: &str);
}

/// Watches any number of independent camera streams.
pub struct DisposalMonitor {
    config: Config,
    scenes: HashMap<String, scene::Scene>,
}

impl DisposalMonitor {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            scenes: HashMap::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn scene(&self, src: &str) -> Option<&scene::Scene> {
        self.scenes.get(src)
    }
}

impl Monitoring for DisposalMonitor {
    fn update(&mut self, frame: &Frame, src: &str) -> Result<Vec<Event>> {
        let scene = match self.scenes.get_mut(src) {
            Some(scene) => scene,
            None => self
                .scenes
                .entry(src.to_string())
                .or_insert_with(|| scene::Scene::new(&self.config)),
        };

        scene.update(frame)
    }

    #[inline]
    fn tracks(&self, src: &str) -> Rc<[Track]> {
        if let Some(scene) = self.scenes.get(src) {
            return scene.tracks().into_boxed_slice().into();
        }

        Rc::new([])
    }

    #[inline]
    fn events(&self, src: &str) -> &[Event] {
        match self.scenes.get(src) {
            Some(scene) => scene.events(),
            None => &[],
        }
    }

    fn reset(&mut self, src: &str) {
        self.scenes.remove(src);
    }
}
