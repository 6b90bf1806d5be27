//! Birthday celebration overlay for a terminal dashboard.
//!
//! On a configured birthday the plugin dims the other dashboard modules,
//! shows a greeting and runs a firework display with confetti bursts on top.
//! Everything is driven by one cooperative [`scheduler::Scheduler`]: the host
//! calls [`BirthdayModule::pump`] with the current time and renders the
//! stage with [`render::Compositor`].

pub mod canvas;
pub mod celebration;
pub mod confetti;
pub mod config;
pub mod date;
pub mod date_scheduler;
pub mod effects;
pub mod error;
pub mod i18n;
pub mod lifecycle;
pub mod plugin;
pub mod render;
pub mod runtime;
pub mod scheduler;
pub mod surface;

pub use celebration::{CelebrationController, CelebrationState};
pub use config::{Birthday, Config, EffectDuration};
pub use date::{Calendar, CalendarDay, FixedCalendar, MonthDay, SystemCalendar};
pub use effects::FireworkStyle;
pub use lifecycle::HostHooks;
pub use plugin::BirthdayModule;
pub use surface::{ModuleRegion, Viewport};
