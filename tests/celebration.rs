use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use birthday_fireworks::render::Compositor;
use birthday_fireworks::surface::BIRTHDAY_REGION;
use birthday_fireworks::{
    BirthdayModule, Calendar, CalendarDay, CelebrationState, Config, FixedCalendar, HostHooks,
    ModuleRegion, Viewport,
};

const FRAME: Duration = Duration::from_millis(16);

fn day(s: &str) -> CalendarDay {
    CalendarDay::new(s.parse().unwrap(), false)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// A calendar the test can turn over to the next day.
#[derive(Clone)]
struct SharedCalendar(Rc<Cell<CalendarDay>>);

impl Calendar for SharedCalendar {
    fn today(&self) -> CalendarDay {
        self.0.get()
    }
}

fn config(extra: &str) -> Config {
    let text = format!(
        r#"
        {extra}

        [[birthdays]]
        name = "Alice"
        date = "03-15"
        "#
    );
    Config::from_toml_str(&text).unwrap()
}

fn module(config: Config, calendar: Box<dyn Calendar>) -> BirthdayModule {
    let mut module = BirthdayModule::new(
        config,
        Viewport::new(80, 24),
        calendar,
        fastrand::Rng::with_seed(11),
    );
    module.add_module(ModuleRegion::new("clock", 2, 1));
    module.start();
    module
}

/// Pumps the module at 60 fps until `until`.
fn pump_until(module: &mut BirthdayModule, until: Duration) {
    while module.now() < until {
        let next = (module.now() + FRAME).min(until);
        module.pump(next);
    }
}

fn clock_is_dimmed(module: &BirthdayModule) -> bool {
    module
        .stage()
        .modules()
        .iter()
        .find(|m| m.name == "clock")
        .is_some_and(|m| m.filter.is_some())
}

#[test]
fn birthday_celebrates_after_the_startup_delay_and_stops_on_time() {
    let mut module = module(
        config("firework_duration = 5000"),
        Box::new(FixedCalendar(day("03-15"))),
    );

    pump_until(&mut module, ms(1990));
    assert_eq!(module.state(), &CelebrationState::Idle);
    assert!(module.layers().is_empty());

    pump_until(&mut module, ms(2016));
    assert_eq!(module.state().celebrant(), Some("Alice"));
    let overlay = module.stage().overlay().unwrap();
    assert!(overlay.visible);
    assert!(overlay.message.as_deref().unwrap().contains("Alice"));
    assert!(clock_is_dimmed(&module));
    assert_eq!(module.layers().len(), 2);

    pump_until(&mut module, ms(6990));
    assert!(module.state().is_celebrating());

    pump_until(&mut module, ms(7016));
    assert_eq!(module.state(), &CelebrationState::Idle);
    assert!(!module.stage().overlay().unwrap().visible);
    assert!(!clock_is_dimmed(&module));
    assert!(module.layers().is_empty());
    assert_eq!(module.controller().confetti().particle_count(), 0);
}

#[test]
fn birthday_region_is_never_dimmed() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("03-15"))));
    pump_until(&mut module, ms(2500));
    let region = module
        .stage()
        .modules()
        .iter()
        .find(|m| m.name == BIRTHDAY_REGION)
        .unwrap();
    assert!(region.filter.is_none());
    assert!(clock_is_dimmed(&module));
}

#[test]
fn other_days_are_checked_every_minute_and_stay_idle() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("04-01"))));
    pump_until(&mut module, ms(65_000));
    assert_eq!(module.checks(), 2);
    assert_eq!(module.state(), &CelebrationState::Idle);
    assert!(module.stage().overlay().is_none());
    assert!(module.layers().is_empty());
}

#[test]
fn malformed_birthdays_never_celebrate() {
    let config = Config::from_toml_str("birthdays = \"Alice 03-15\"").unwrap();
    let mut module = module(config, Box::new(FixedCalendar(day("03-15"))));
    pump_until(&mut module, ms(125_000));
    assert_eq!(module.checks(), 3);
    assert_eq!(module.state(), &CelebrationState::Idle);
}

#[test]
fn leap_day_birthday_is_celebrated_on_march_first() {
    let config = Config::from_toml_str(
        r#"
        [[birthdays]]
        name = "Leo"
        date = "02-29"
        "#,
    )
    .unwrap();
    let mut module = module(config, Box::new(FixedCalendar(day("03-01"))));
    pump_until(&mut module, ms(2016));
    assert_eq!(module.state().celebrant(), Some("Leo"));
}

#[test]
fn suspend_then_resume_on_the_same_day_restarts() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("03-15"))));
    pump_until(&mut module, ms(3500));
    assert!(module.state().is_celebrating());

    module.on_suspend();
    assert_eq!(
        module.state(),
        &CelebrationState::Suspended {
            name: "Alice".into()
        }
    );
    assert!(module.stage().overlay().is_none());
    assert!(module.layers().is_empty());
    assert!(!clock_is_dimmed(&module));

    // A periodic check while suspended must not start a second celebration.
    pump_until(&mut module, ms(61_000));
    assert!(module.state().was_suspended());
    assert!(module.layers().is_empty());

    module.on_resume();
    assert!(module.state().is_celebrating());
    assert!(module.layers().is_empty());

    pump_until(&mut module, ms(61_516));
    assert_eq!(module.layers().len(), 2);
    assert!(module.stage().overlay().unwrap().visible);
    assert!(clock_is_dimmed(&module));
    assert!(module.controller().fireworks().unwrap().is_running());
}

#[test]
fn resume_after_the_day_is_over_goes_idle() {
    let today = Rc::new(Cell::new(day("03-15")));
    let mut module = module(config(""), Box::new(SharedCalendar(today.clone())));
    pump_until(&mut module, ms(2500));
    module.on_suspend();

    today.set(day("03-16"));
    module.on_resume();
    assert_eq!(module.state(), &CelebrationState::Idle);
    assert!(module.stage().overlay().is_none());

    pump_until(&mut module, ms(5000));
    assert!(module.layers().is_empty());
    assert!(!clock_is_dimmed(&module));
}

#[test]
fn resume_ignores_the_next_days_celebrant_until_the_next_check() {
    let config = Config::from_toml_str(
        r#"
        [[birthdays]]
        name = "Alice"
        date = "03-15"

        [[birthdays]]
        name = "Bob"
        date = "03-16"
        "#,
    )
    .unwrap();
    let today = Rc::new(Cell::new(day("03-15")));
    let mut module = module(config, Box::new(SharedCalendar(today.clone())));
    pump_until(&mut module, ms(2500));
    assert_eq!(module.state().celebrant(), Some("Alice"));
    module.on_suspend();

    today.set(day("03-16"));
    module.on_resume();
    assert_eq!(module.state(), &CelebrationState::Idle);
    pump_until(&mut module, ms(3500));
    assert!(module.layers().is_empty());

    pump_until(&mut module, ms(60_016));
    assert_eq!(module.state().celebrant(), Some("Bob"));
}

#[test]
fn leap_day_celebrant_resumes_on_march_first() {
    let config = Config::from_toml_str(
        r#"
        [[birthdays]]
        name = "Leo"
        date = "02-29"
        "#,
    )
    .unwrap();
    let mut module = module(config, Box::new(FixedCalendar(day("03-01"))));
    pump_until(&mut module, ms(2500));
    module.on_suspend();
    module.on_resume();
    assert_eq!(module.state().celebrant(), Some("Leo"));

    pump_until(&mut module, ms(3016));
    assert_eq!(module.layers().len(), 2);
    assert!(module.stage().overlay().unwrap().visible);
}

#[test]
fn lifecycle_signals_without_a_celebration_are_ignored() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("04-01"))));
    module.on_suspend();
    module.on_resume();
    pump_until(&mut module, ms(3000));
    assert_eq!(module.state(), &CelebrationState::Idle);
}

#[test]
fn stopping_the_module_ends_the_celebration_and_the_checks() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("03-15"))));
    pump_until(&mut module, ms(3000));
    assert!(module.state().is_celebrating());

    module.stop();
    assert_eq!(module.state(), &CelebrationState::Idle);
    assert!(module.layers().is_empty());
    assert!(!clock_is_dimmed(&module));

    let checks = module.checks();
    pump_until(&mut module, ms(130_000));
    assert_eq!(module.checks(), checks);
    assert_eq!(module.state(), &CelebrationState::Idle);
}

#[test]
fn stopping_a_suspended_module_forgets_the_celebrant() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("03-15"))));
    pump_until(&mut module, ms(3000));
    module.on_suspend();
    module.stop();
    assert_eq!(module.state(), &CelebrationState::Idle);
    module.on_resume();
    pump_until(&mut module, ms(4000));
    assert_eq!(module.state(), &CelebrationState::Idle);
}

#[test]
fn starting_twice_arms_one_set_of_checks() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("04-01"))));
    module.start();
    pump_until(&mut module, ms(61_000));
    assert_eq!(module.checks(), 2);
}

#[test]
fn render_region_carries_the_message() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("03-15"))));
    assert!(module.render_region().lines.is_empty());

    pump_until(&mut module, ms(2016));
    let region = module.render_region();
    assert_eq!(region.name, BIRTHDAY_REGION);
    assert!(region.visible);
    assert!(region.lines[0].contains("Alice"));
}

#[test]
fn resize_follows_the_terminal() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("03-15"))));
    pump_until(&mut module, ms(2500));
    module.on_resize(40, 10);
    pump_until(&mut module, ms(2600));
    for canvas in module.layers() {
        assert_eq!((canvas.width(), canvas.height()), (40, 20));
    }
}

#[test]
fn a_celebrating_frame_renders() {
    let mut module = module(config(""), Box::new(FixedCalendar(day("03-15"))));
    pump_until(&mut module, ms(4000));

    let mut compositor = Compositor::new((0, 0, 0));
    let mut out = Vec::new();
    let layers = module.layers();
    compositor
        .render(&mut out, module.stage(), &layers, module.now())
        .unwrap();
    let frame = String::from_utf8(out).unwrap();
    assert!(frame.starts_with("\x1b[H"));
    assert_eq!(frame.matches("\r\n").count(), 23);
    assert!(frame.contains('A'));
}
