//! When to ask "whose birthday is it?".
//!
//! One check after the startup delay, then one a minute for as long as the
//! process lives.

use std::time::Duration;

use tracing::{debug, error};

use crate::celebration::CelebrationController;
use crate::config::Birthday;
use crate::date::{find_birthday, CalendarDay};
use crate::runtime::Runtime;
use crate::scheduler::{Task, TimerHandle};

pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
pub struct DateScheduler {
    initial: Option<TimerHandle>,
    periodic: Option<TimerHandle>,
    checks: u64,
}

impl DateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the startup check and the minute interval. Arming twice is a
    /// no-op.
    pub fn init(&mut self, rt: &mut Runtime, startup_delay: Duration) {
        if self.periodic.is_some() {
            debug!("birthday checks already scheduled");
            return;
        }
        debug!(?startup_delay, "scheduling birthday checks");
        self.initial = Some(rt.scheduler.set_timeout(startup_delay, Task::InitialCheck));
        self.periodic = Some(rt.scheduler.set_interval(CHECK_INTERVAL, Task::PeriodicCheck));
    }

    pub fn is_armed(&self) -> bool {
        self.periodic.is_some()
    }

    /// Checks performed so far, including ones that found nothing.
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Runs one check. Returns true when it started a celebration.
    pub fn run_check(
        &mut self,
        task: Task,
        controller: &mut CelebrationController,
        rt: &mut Runtime,
        today: &CalendarDay,
        birthdays: Option<&[Birthday]>,
    ) -> bool {
        if task == Task::InitialCheck {
            debug!("initial birthday check after startup delay");
            self.initial = None;
        }
        self.checks += 1;
        debug!(date = %today.month_day, "checking birthdays");

        let Some(records) = birthdays else {
            error!("birthdays configuration is not a list, skipping check");
            return false;
        };
        let Some(birthday) = find_birthday(today, records) else {
            return false;
        };
        if !controller.is_idle() {
            debug!(name = %birthday.name, "birthday found but a celebration is already active");
            return false;
        }
        debug!(name = %birthday.name, date = %today.month_day, "found birthday");
        controller.start(&birthday.name, rt)
    }

    pub fn cancel(&mut self, rt: &mut Runtime) {
        for handle in [self.initial.take(), self.periodic.take()].into_iter().flatten() {
            rt.scheduler.cancel_timer(handle);
        }
    }
}
