use std::time::Duration;

use crate::scheduler::Scheduler;
use crate::surface::{Stage, Viewport};

/// The shared clock and page every component acts on.
#[derive(Debug)]
pub struct Runtime {
    pub scheduler: Scheduler,
    pub stage: Stage,
}

impl Runtime {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            scheduler: Scheduler::new(),
            stage: Stage::new(viewport),
        }
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }
}
