//! Host lifecycle boundary.
//!
//! The dashboard calls [`HostHooks`] when the plugin's page is hidden or
//! shown again and when it wants the plugin's region. The adapter maps those
//! calls onto the controller and logs them; it holds no state.

use tracing::debug;

use crate::celebration::CelebrationController;
use crate::config::Birthday;
use crate::date::CalendarDay;
use crate::runtime::Runtime;
use crate::surface::ModuleRegion;

/// What a dashboard host may call on a plugin.
pub trait HostHooks {
    fn on_suspend(&mut self);

    fn on_resume(&mut self);

    /// The plugin's own region, attached by the host.
    fn render_region(&self) -> ModuleRegion;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScreenLifecycleAdapter;

impl ScreenLifecycleAdapter {
    pub fn suspend(&self, controller: &mut CelebrationController, rt: &mut Runtime) {
        debug!(state = ?controller.state(), "module suspend triggered");
        controller.suspend(rt);
    }

    pub fn resume(
        &self,
        controller: &mut CelebrationController,
        rt: &mut Runtime,
        today: &CalendarDay,
        birthdays: Option<&[Birthday]>,
    ) {
        debug!(state = ?controller.state(), "module resume triggered");
        controller.resume(rt, today, birthdays);
    }
}
