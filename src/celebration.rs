//! The celebration state machine.
//!
//! ```text
//!   Idle --start--> Celebrating --stop--> Idle
//!                     |    ^
//!               suspend    resume (same day, after 500 ms)
//!                     v    |
//!                   Suspended --resume (day over)--> Idle
//! ```
//!
//! The controller owns every resource a celebration creates: the fireworks,
//! the confetti cannon and the timers that stop, restart and re-fire them.
//! Every way out of `Celebrating` goes through one teardown that releases all
//! of them.

use std::time::Duration;

use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::config::{Birthday, Config, EffectDuration};
use crate::confetti::ConfettiCannon;
use crate::date::{is_birthday_of, CalendarDay};
use crate::effects::{FireworkStyle, Fireworks};
use crate::i18n::{self, Translate};
use crate::runtime::Runtime;
use crate::scheduler::{Task, TimerHandle};

/// Brightness of the other dashboard modules during a celebration.
pub const DIM_BRIGHTNESS: f32 = 0.3;
pub const DIM_TRANSITION: Duration = Duration::from_millis(500);
pub const FIRST_CONFETTI_DELAY: Duration = Duration::from_millis(1000);
pub const RESTART_DELAY: Duration = Duration::from_millis(500);
/// Confetti bursts are spaced 2 to 8 seconds apart.
const CONFETTI_GAP_MS: std::ops::Range<u64> = 2000..8000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CelebrationState {
    #[default]
    Idle,
    Celebrating { name: String },
    /// Interrupted by the host; the name survives for resume.
    Suspended { name: String },
}

impl CelebrationState {
    pub fn is_celebrating(&self) -> bool {
        matches!(self, CelebrationState::Celebrating { .. })
    }

    pub fn was_suspended(&self) -> bool {
        matches!(self, CelebrationState::Suspended { .. })
    }

    pub fn celebrant(&self) -> Option<&str> {
        match self {
            CelebrationState::Idle => None,
            CelebrationState::Celebrating { name } | CelebrationState::Suspended { name } => {
                Some(name)
            }
        }
    }
}

pub struct CelebrationController {
    state: CelebrationState,
    style: FireworkStyle,
    fireworks: Option<Fireworks>,
    confetti: ConfettiCannon,
    firework_duration: EffectDuration,
    confetti_duration: EffectDuration,
    messages: Box<dyn Translate>,
    rng: fastrand::Rng,
    stop_timer: Option<TimerHandle>,
    restart_timer: Option<TimerHandle>,
    confetti_timer: Option<TimerHandle>,
    /// When confetti stops re-firing; `None` while unbounded.
    confetti_until: Option<Duration>,
}

impl CelebrationController {
    pub fn new(config: &Config, messages: Box<dyn Translate>, mut rng: fastrand::Rng) -> Self {
        let confetti = ConfettiCannon::new(rng.fork());
        Self {
            state: CelebrationState::Idle,
            style: config.firework_style,
            fireworks: None,
            confetti,
            firework_duration: config.firework_duration,
            confetti_duration: config.confetti_duration,
            messages,
            rng,
            stop_timer: None,
            restart_timer: None,
            confetti_timer: None,
            confetti_until: None,
        }
    }

    pub fn state(&self) -> &CelebrationState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == CelebrationState::Idle
    }

    pub fn style(&self) -> FireworkStyle {
        self.style
    }

    pub fn fireworks(&self) -> Option<&Fireworks> {
        self.fireworks.as_ref()
    }

    pub fn confetti(&self) -> &ConfettiCannon {
        &self.confetti
    }

    /// Starts a celebration for `name`. Ignored unless idle.
    pub fn start(&mut self, name: &str, rt: &mut Runtime) -> bool {
        if !self.is_idle() {
            debug!(name, state = ?self.state, "celebration already in progress, ignoring start");
            return false;
        }
        self.state = CelebrationState::Celebrating {
            name: name.to_string(),
        };
        self.celebrate(name, rt);
        true
    }

    fn celebrate(&mut self, name: &str, rt: &mut Runtime) {
        debug!(name, "starting celebration");
        self.ensure_fireworks(rt);
        self.confetti.init(rt);

        let message = i18n::pick_message(self.messages.as_ref(), name, &mut self.rng);
        let overlay = rt.stage.ensure_overlay();
        overlay.message = Some(message);
        overlay.visible = true;

        let now = rt.now();
        rt.stage.dim_modules(DIM_BRIGHTNESS, now, DIM_TRANSITION);

        if let Some(fireworks) = self.fireworks.as_mut() {
            if let Err(err) = fireworks.start(self.firework_duration, rt) {
                warn!(error = %err, "could not start fireworks");
                fireworks.cleanup(rt);
            }
        }

        self.confetti_until = self.confetti_duration.deadline(now);
        self.replace_timer(TimerSlot::Confetti, rt, FIRST_CONFETTI_DELAY, Task::ConfettiBurst);

        if let EffectDuration::Finite(duration) = self.firework_duration {
            debug!(?duration, "celebration will stop on its own");
            self.replace_timer(TimerSlot::Stop, rt, duration, Task::StopCelebration);
        }
    }

    /// Keeps the one shared display, replacing it only once a previous
    /// cleanup has left it dormant.
    fn ensure_fireworks(&mut self, rt: &mut Runtime) {
        if self.fireworks.as_ref().is_some_and(|fw| !fw.is_dormant()) {
            return;
        }
        match Fireworks::new(self.style, rt, self.rng.fork()) {
            Ok(fireworks) => self.fireworks = Some(fireworks),
            Err(err) => {
                warn!(style = %self.style, error = %err, "could not create fireworks");
                self.fireworks = None;
            }
        }
    }

    /// Ends a running or suspended celebration and hides the message.
    pub fn stop(&mut self, rt: &mut Runtime) {
        if self.is_idle() {
            debug!("no celebration to stop");
            return;
        }
        debug!(celebrant = ?self.state.celebrant(), "stopping celebration");
        self.teardown(rt);
        if let Some(overlay) = rt.stage.overlay_mut() {
            overlay.visible = false;
        }
        self.state = CelebrationState::Idle;
    }

    /// Host suspend: tears everything down but remembers who was celebrated.
    pub fn suspend(&mut self, rt: &mut Runtime) {
        let CelebrationState::Celebrating { name } = &self.state else {
            debug!("no active celebration to suspend");
            return;
        };
        let name = name.clone();
        debug!(name = %name, "suspending celebration");
        self.teardown(rt);
        rt.stage.remove_overlay();
        self.state = CelebrationState::Suspended { name };
    }

    /// Host resume: restarts the same celebrant after a short delay when
    /// today is still their birthday, otherwise goes back to idle.
    pub fn resume(&mut self, rt: &mut Runtime, today: &CalendarDay, birthdays: Option<&[Birthday]>) {
        let CelebrationState::Suspended { name } = &self.state else {
            debug!("no celebration to resume");
            return;
        };
        let name = name.clone();
        self.teardown(rt);
        rt.stage.remove_overlay();

        if birthdays.is_some_and(|records| is_birthday_of(today, records, &name)) {
            debug!(name = %name, "birthday still active, restarting celebration");
            self.state = CelebrationState::Celebrating { name };
            self.replace_timer(TimerSlot::Restart, rt, RESTART_DELAY, Task::RestartCelebration);
        } else {
            warn!(name = %name, "birthday is no longer active, cleaning up");
            self.state = CelebrationState::Idle;
            self.teardown(rt);
        }
    }

    /// Runs a controller timer task.
    pub fn handle(&mut self, task: Task, rt: &mut Runtime) {
        match task {
            Task::StopCelebration => {
                self.stop_timer = None;
                self.stop(rt);
            }
            Task::RestartCelebration => {
                self.restart_timer = None;
                if let CelebrationState::Celebrating { name } = &self.state {
                    let name = name.clone();
                    self.celebrate(&name, rt);
                }
            }
            Task::ConfettiBurst => {
                self.confetti_timer = None;
                self.confetti_burst(rt);
            }
            Task::InitialCheck | Task::PeriodicCheck => {
                debug!(?task, "date check task routed to the controller, ignoring");
            }
        }
    }

    fn confetti_burst(&mut self, rt: &mut Runtime) {
        if !self.state.is_celebrating() {
            return;
        }
        if self.confetti_until.is_some_and(|end| rt.now() >= end) {
            debug!("confetti duration elapsed");
            return;
        }
        self.confetti.fire(rt);
        let gap = Duration::from_millis(self.rng.u64(CONFETTI_GAP_MS));
        self.confetti_timer = Some(rt.scheduler.set_timeout(gap, Task::ConfettiBurst));
    }

    pub fn fireworks_frame(&mut self, rt: &mut Runtime) {
        if let Some(fireworks) = self.fireworks.as_mut() {
            fireworks.frame(rt);
        }
    }

    pub fn confetti_frame(&mut self, rt: &mut Runtime) {
        self.confetti.frame(rt);
    }

    pub fn resize(&mut self, rt: &Runtime) {
        if let Some(fireworks) = self.fireworks.as_mut() {
            if !fireworks.is_dormant() {
                fireworks.resize(rt);
            }
        }
        self.confetti.resize(rt);
    }

    /// Canvases attached to the stage, bottom first.
    pub fn layers<'a>(&'a self, rt: &Runtime) -> Vec<&'a Canvas> {
        let surfaces = [
            self.fireworks.as_ref().map(|fw| fw.surface()),
            self.confetti.surface(),
        ];
        rt.stage
            .attached()
            .filter_map(|id| {
                surfaces
                    .iter()
                    .flatten()
                    .copied()
                    .find(|surface| surface.id() == id)
                    .and_then(|surface| surface.canvas())
            })
            .collect()
    }

    fn teardown(&mut self, rt: &mut Runtime) {
        for handle in [
            self.stop_timer.take(),
            self.restart_timer.take(),
            self.confetti_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            rt.scheduler.cancel_timer(handle);
        }
        self.confetti_until = None;
        if let Some(fireworks) = self.fireworks.as_mut() {
            fireworks.cleanup(rt);
        }
        self.confetti.cleanup(rt);
        rt.stage.clear_dimming();
    }

    fn replace_timer(&mut self, slot: TimerSlot, rt: &mut Runtime, delay: Duration, task: Task) {
        let timer = match slot {
            TimerSlot::Stop => &mut self.stop_timer,
            TimerSlot::Restart => &mut self.restart_timer,
            TimerSlot::Confetti => &mut self.confetti_timer,
        };
        if let Some(old) = timer.take() {
            rt.scheduler.cancel_timer(old);
        }
        *timer = Some(rt.scheduler.set_timeout(delay, task));
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerSlot {
    Stop,
    Restart,
    Confetti,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Catalog;
    use crate::scheduler::FrameTarget;
    use crate::surface::{ModuleRegion, Viewport, BIRTHDAY_REGION};

    fn setup(config: Config) -> (Runtime, CelebrationController) {
        let mut rt = Runtime::new(Viewport::new(100, 30));
        rt.stage.add_module(ModuleRegion::new("clock", 0, 0));
        rt.stage.add_module(ModuleRegion::new(BIRTHDAY_REGION, 0, 10));
        let controller =
            CelebrationController::new(&config, Box::new(Catalog::default()), fastrand::Rng::with_seed(3));
        (rt, controller)
    }

    fn today(s: &str) -> CalendarDay {
        CalendarDay::new(s.parse().unwrap(), false)
    }

    /// Runs timers and frames until `until`, one 16 ms display frame at a time.
    fn run_until(rt: &mut Runtime, controller: &mut CelebrationController, until: Duration) {
        while rt.now() < until {
            let next = (rt.now() + Duration::from_millis(16)).min(until);
            while let Some(task) = rt.scheduler.pop_due(next) {
                controller.handle(task, rt);
            }
            rt.scheduler.advance(next);
            for target in rt.scheduler.take_frames() {
                match target {
                    FrameTarget::Fireworks => controller.fireworks_frame(rt),
                    FrameTarget::Confetti => controller.confetti_frame(rt),
                }
            }
        }
    }

    fn assert_torn_down(rt: &Runtime, controller: &CelebrationController) {
        assert_eq!(rt.scheduler.pending_frames(FrameTarget::Fireworks), 0);
        assert_eq!(rt.scheduler.pending_frames(FrameTarget::Confetti), 0);
        for task in [Task::StopCelebration, Task::RestartCelebration, Task::ConfettiBurst] {
            assert_eq!(rt.scheduler.pending_timers(task), 0, "{task:?} still armed");
        }
        assert_eq!(rt.stage.attached().count(), 0);
        assert!(!rt.stage.is_dimmed());
        assert_eq!(controller.confetti().particle_count(), 0);
        assert!(controller.fireworks().is_none_or(|fw| fw.live_count() == 0));
    }

    #[test]
    fn start_dims_shows_the_message_and_runs_effects() {
        let (mut rt, mut controller) = setup(Config::default());
        assert!(controller.start("Alice", &mut rt));

        assert_eq!(controller.state().celebrant(), Some("Alice"));
        let overlay = rt.stage.overlay().unwrap();
        assert!(overlay.visible);
        assert!(overlay.message.as_deref().unwrap().contains("Alice"));
        assert!(rt.stage.modules()[0].filter.is_some());
        assert!(rt.stage.modules()[1].filter.is_none());
        assert_eq!(rt.stage.attached().count(), 2);
        assert_eq!(rt.scheduler.pending_frames(FrameTarget::Fireworks), 1);
        assert_eq!(rt.scheduler.pending_timers(Task::ConfettiBurst), 1);
        assert_eq!(rt.scheduler.pending_timers(Task::StopCelebration), 0);
    }

    #[test]
    fn second_start_is_ignored() {
        let (mut rt, mut controller) = setup(Config::default());
        controller.start("Alice", &mut rt);
        assert!(!controller.start("Bob", &mut rt));
        assert_eq!(controller.state().celebrant(), Some("Alice"));
        assert_eq!(rt.scheduler.pending_frames(FrameTarget::Fireworks), 1);
        assert_eq!(rt.scheduler.pending_timers(Task::ConfettiBurst), 1);
    }

    #[test]
    fn finite_duration_stops_the_celebration() {
        let config = Config {
            firework_duration: EffectDuration::millis(3000),
            ..Config::default()
        };
        let (mut rt, mut controller) = setup(config);
        controller.start("Alice", &mut rt);

        run_until(&mut rt, &mut controller, Duration::from_millis(2990));
        assert!(controller.state().is_celebrating());
        assert!(controller.confetti().particle_count() > 0);

        run_until(&mut rt, &mut controller, Duration::from_millis(3000));
        assert!(controller.is_idle());
        assert!(!rt.stage.overlay().unwrap().visible);
        assert_torn_down(&rt, &controller);
    }

    #[test]
    fn confetti_stops_refiring_after_its_duration() {
        let config = Config {
            confetti_duration: EffectDuration::millis(1500),
            ..Config::default()
        };
        let (mut rt, mut controller) = setup(config);
        controller.start("Alice", &mut rt);
        run_until(&mut rt, &mut controller, Duration::from_millis(1100));
        assert_eq!(rt.scheduler.pending_timers(Task::ConfettiBurst), 1);

        run_until(&mut rt, &mut controller, Duration::from_secs(20));
        assert_eq!(rt.scheduler.pending_timers(Task::ConfettiBurst), 0);
        assert!(controller.state().is_celebrating());
    }

    #[test]
    fn suspend_keeps_the_name_and_releases_everything() {
        let (mut rt, mut controller) = setup(Config::default());
        controller.start("Alice", &mut rt);
        run_until(&mut rt, &mut controller, Duration::from_millis(1200));
        controller.suspend(&mut rt);

        assert_eq!(
            controller.state(),
            &CelebrationState::Suspended {
                name: "Alice".into()
            }
        );
        assert!(rt.stage.overlay().is_none());
        assert_torn_down(&rt, &controller);

        controller.suspend(&mut rt);
        assert!(controller.state().was_suspended());
    }

    #[test]
    fn resume_on_the_same_day_restarts_after_a_delay() {
        let (mut rt, mut controller) = setup(Config::default());
        let birthdays = vec![Birthday::new("Alice", "03-15")];
        controller.start("Alice", &mut rt);
        controller.suspend(&mut rt);

        controller.resume(&mut rt, &today("03-15"), Some(&birthdays));
        assert!(controller.state().is_celebrating());
        assert_eq!(rt.stage.attached().count(), 0);
        assert_eq!(rt.scheduler.pending_timers(Task::RestartCelebration), 1);

        let restart_at = rt.now() + RESTART_DELAY;
        run_until(&mut rt, &mut controller, restart_at);
        assert_eq!(rt.stage.attached().count(), 2);
        assert!(rt.stage.overlay().unwrap().visible);
        assert!(controller.fireworks().unwrap().is_running());
    }

    #[test]
    fn resume_on_another_day_goes_idle() {
        let (mut rt, mut controller) = setup(Config::default());
        let birthdays = vec![Birthday::new("Alice", "03-15")];
        controller.start("Alice", &mut rt);
        controller.suspend(&mut rt);

        controller.resume(&mut rt, &today("03-16"), Some(&birthdays));
        assert!(controller.is_idle());
        assert!(rt.stage.overlay().is_none());
        assert_torn_down(&rt, &controller);
    }

    #[test]
    fn resume_does_not_switch_to_another_celebrant() {
        let (mut rt, mut controller) = setup(Config::default());
        let birthdays = vec![Birthday::new("Alice", "03-15"), Birthday::new("Bob", "03-16")];
        controller.start("Alice", &mut rt);
        controller.suspend(&mut rt);

        controller.resume(&mut rt, &today("03-16"), Some(&birthdays));
        assert_eq!(controller.state(), &CelebrationState::Idle);
        assert_eq!(rt.scheduler.pending_timers(Task::RestartCelebration), 0);
        assert_torn_down(&rt, &controller);
    }

    #[test]
    fn resume_keeps_the_celebrant_when_others_share_the_day() {
        let (mut rt, mut controller) = setup(Config::default());
        let birthdays = vec![Birthday::new("Alice", "03-15"), Birthday::new("Bob", "03-15")];
        controller.start("Bob", &mut rt);
        controller.suspend(&mut rt);

        controller.resume(&mut rt, &today("03-15"), Some(&birthdays));
        assert_eq!(controller.state().celebrant(), Some("Bob"));
        let restart_at = rt.now() + RESTART_DELAY;
        run_until(&mut rt, &mut controller, restart_at);
        assert!(rt.stage.overlay().unwrap().message.as_deref().unwrap().contains("Bob"));
    }

    #[test]
    fn leap_day_celebrant_resumes_on_march_first() {
        let (mut rt, mut controller) = setup(Config::default());
        let birthdays = vec![Birthday::new("Leo", "02-29")];
        controller.start("Leo", &mut rt);
        controller.suspend(&mut rt);

        controller.resume(&mut rt, &today("03-01"), Some(&birthdays));
        assert_eq!(controller.state().celebrant(), Some("Leo"));
        assert!(controller.state().is_celebrating());
        assert_eq!(rt.scheduler.pending_timers(Task::RestartCelebration), 1);
    }

    #[test]
    fn resume_with_malformed_birthdays_goes_idle() {
        let (mut rt, mut controller) = setup(Config::default());
        controller.start("Alice", &mut rt);
        controller.suspend(&mut rt);
        controller.resume(&mut rt, &today("03-15"), None);
        assert!(controller.is_idle());
        assert_torn_down(&rt, &controller);
    }

    #[test]
    fn suspend_before_restart_cancels_it() {
        let (mut rt, mut controller) = setup(Config::default());
        let birthdays = vec![Birthday::new("Alice", "03-15")];
        controller.start("Alice", &mut rt);
        controller.suspend(&mut rt);
        controller.resume(&mut rt, &today("03-15"), Some(&birthdays));
        controller.suspend(&mut rt);

        assert!(controller.state().was_suspended());
        assert_torn_down(&rt, &controller);
    }

    #[test]
    fn redundant_signals_are_no_ops() {
        let (mut rt, mut controller) = setup(Config::default());
        controller.stop(&mut rt);
        controller.suspend(&mut rt);
        controller.resume(&mut rt, &today("03-15"), None);
        assert!(controller.is_idle());
        assert!(rt.stage.overlay().is_none());
    }

    #[test]
    fn stop_while_suspended_forgets_the_celebrant() {
        let (mut rt, mut controller) = setup(Config::default());
        controller.start("Alice", &mut rt);
        controller.suspend(&mut rt);
        controller.stop(&mut rt);
        assert!(controller.is_idle());
        assert!(rt.stage.overlay().is_none());
        assert_torn_down(&rt, &controller);
    }

    #[test]
    fn a_new_celebration_gets_a_fresh_display() {
        let (mut rt, mut controller) = setup(Config::default());
        controller.start("Alice", &mut rt);
        controller.stop(&mut rt);
        assert!(controller.fireworks().unwrap().is_dormant());

        controller.start("Bob", &mut rt);
        let fireworks = controller.fireworks().unwrap();
        assert!(!fireworks.is_dormant());
        assert!(fireworks.is_running());
        assert_eq!(controller.layers(&rt).len(), 2);
    }
}
