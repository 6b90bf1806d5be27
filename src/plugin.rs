//! The plugin object a dashboard host drives.

use std::time::Duration;

use tracing::debug;

use crate::canvas::Canvas;
use crate::celebration::{CelebrationController, CelebrationState};
use crate::config::Config;
use crate::date::Calendar;
use crate::date_scheduler::DateScheduler;
use crate::i18n::{Catalog, Translate};
use crate::lifecycle::{HostHooks, ScreenLifecycleAdapter};
use crate::runtime::Runtime;
use crate::scheduler::{FrameTarget, Task};
use crate::surface::{ModuleRegion, Stage, Viewport, BIRTHDAY_REGION};

/// Everything the birthday overlay needs, held in one place: configuration,
/// the shared clock and stage, the celebration controller and the date
/// checks.
pub struct BirthdayModule {
    config: Config,
    runtime: Runtime,
    controller: CelebrationController,
    dates: DateScheduler,
    lifecycle: ScreenLifecycleAdapter,
    calendar: Box<dyn Calendar>,
}

impl BirthdayModule {
    pub fn new(
        config: Config,
        viewport: Viewport,
        calendar: Box<dyn Calendar>,
        rng: fastrand::Rng,
    ) -> Self {
        let messages = Box::new(Catalog::from_config(&config));
        Self::with_messages(config, viewport, calendar, messages, rng)
    }

    pub fn with_messages(
        config: Config,
        viewport: Viewport,
        calendar: Box<dyn Calendar>,
        messages: Box<dyn Translate>,
        rng: fastrand::Rng,
    ) -> Self {
        let controller = CelebrationController::new(&config, messages, rng);
        Self {
            config,
            runtime: Runtime::new(viewport),
            controller,
            dates: DateScheduler::new(),
            lifecycle: ScreenLifecycleAdapter,
            calendar,
        }
    }

    /// Registers the plugin's region and arms the birthday checks. Starting
    /// twice is a no-op.
    pub fn start(&mut self) {
        if self.dates.is_armed() {
            debug!("birthday module already started");
            return;
        }
        debug!(
            language = %self.config.language,
            style = %self.config.firework_style,
            "starting birthday module"
        );
        let region = self.render_region();
        self.runtime.stage.add_module(region);
        self.dates.init(&mut self.runtime, self.config.startup_delay());
    }

    /// Host shutdown: disarms the birthday checks and ends any celebration,
    /// releasing every surface, frame and timer.
    pub fn stop(&mut self) {
        debug!("stopping birthday module");
        self.dates.cancel(&mut self.runtime);
        self.controller.stop(&mut self.runtime);
    }

    /// Brings the plugin up to `now`: due timers first, in due order, then
    /// one display frame.
    pub fn pump(&mut self, now: Duration) {
        while let Some(task) = self.runtime.scheduler.pop_due(now) {
            self.dispatch(task);
        }
        self.runtime.scheduler.advance(now);
        for target in self.runtime.scheduler.take_frames() {
            match target {
                FrameTarget::Fireworks => self.controller.fireworks_frame(&mut self.runtime),
                FrameTarget::Confetti => self.controller.confetti_frame(&mut self.runtime),
            }
        }
    }

    fn dispatch(&mut self, task: Task) {
        match task {
            Task::InitialCheck | Task::PeriodicCheck => {
                let today = self.calendar.today();
                self.dates.run_check(
                    task,
                    &mut self.controller,
                    &mut self.runtime,
                    &today,
                    self.config.birthdays(),
                );
            }
            _ => self.controller.handle(task, &mut self.runtime),
        }
    }

    pub fn on_resize(&mut self, columns: u16, rows: u16) {
        debug!(columns, rows, "viewport resized");
        self.runtime.stage.resize(columns, rows);
        self.controller.resize(&self.runtime);
    }

    /// Adds or replaces another dashboard module's region.
    pub fn add_module(&mut self, region: ModuleRegion) {
        self.runtime.stage.add_module(region);
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut ModuleRegion> {
        self.runtime.stage.module_mut(name)
    }

    pub fn now(&self) -> Duration {
        self.runtime.now()
    }

    pub fn stage(&self) -> &Stage {
        &self.runtime.stage
    }

    pub fn controller(&self) -> &CelebrationController {
        &self.controller
    }

    pub fn state(&self) -> &CelebrationState {
        self.controller.state()
    }

    pub fn checks(&self) -> u64 {
        self.dates.checks()
    }

    /// Attached effect canvases, bottom first.
    pub fn layers(&self) -> Vec<&Canvas> {
        self.controller.layers(&self.runtime)
    }
}

impl HostHooks for BirthdayModule {
    fn on_suspend(&mut self) {
        self.lifecycle.suspend(&mut self.controller, &mut self.runtime);
    }

    fn on_resume(&mut self) {
        let today = self.calendar.today();
        self.lifecycle.resume(
            &mut self.controller,
            &mut self.runtime,
            &today,
            self.config.birthdays(),
        );
    }

    fn render_region(&self) -> ModuleRegion {
        let mut region = ModuleRegion::new(BIRTHDAY_REGION, 0, 0);
        if let Some(overlay) = self.runtime.stage.overlay() {
            region.visible = overlay.visible;
            region.lines.extend(overlay.message.iter().cloned());
        }
        region
    }
}
