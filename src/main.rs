use anyhow::{Context, Result};
use birthday_fireworks::canvas::Rgb;
use birthday_fireworks::render::Compositor;
use birthday_fireworks::{
    BirthdayModule, Calendar, CalendarDay, Config, FireworkStyle, FixedCalendar, HostHooks,
    ModuleRegion, MonthDay, SystemCalendar, Viewport,
};
use clap::Parser;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::fs::File;
use std::io::{stdout, BufWriter};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use time::macros::format_description;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "birthday-fireworks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal dashboard with a birthday celebration overlay", long_about = None)]
struct Cli {
    /// TOML config with birthdays, durations and translations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Firework style, overriding the config (classic, comet, spiral, glow, kaleidoscope, waterfall)
    #[arg(short, long)]
    style: Option<FireworkStyle>,

    /// Pretend today is MM-DD
    #[arg(short, long, value_parser = parse_month_day)]
    date: Option<MonthDay>,

    /// Where log output goes; the terminal is busy drawing
    #[arg(long, default_value = "birthday-fireworks.log")]
    log_file: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Background colour as hex (e.g. 1a1b26)
    #[arg(long, value_parser = parse_hex_color)]
    bg_color: Option<Rgb>,
}

fn parse_month_day(s: &str) -> Result<MonthDay, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_hex_color(hex: &str) -> Result<Rgb, String> {
    let hex = hex.trim_start_matches('#');
    let invalid = || format!("invalid hex color {hex:?}, expected RRGGBB (e.g. 1a1b26)");
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).map_err(|_| invalid());
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let file = File::create(&cli.log_file)
        .with_context(|| format!("could not create log file {}", cli.log_file.display()))?;
    let level = if cli.verbose || config.debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .init();
    Ok(())
}

/// Demo dashboard modules the overlay dims while it celebrates.
struct Dashboard {
    page: usize,
}

const CLOCK: &str = "clock";
const CALENDAR: &str = "calendar";
const NOTES: &str = "notes";

impl Dashboard {
    fn install(module: &mut BirthdayModule) -> Self {
        module.add_module(ModuleRegion::new(CLOCK, 2, 1));
        module.add_module(ModuleRegion::new(CALENDAR, 2, 3));
        let mut notes = ModuleRegion::new(NOTES, 2, 1);
        notes.lines = vec![
            "Page 2".to_string(),
            "p / Tab: back to the birthday page".to_string(),
        ];
        notes.visible = false;
        module.add_module(notes);
        Self { page: 0 }
    }

    fn refresh(&self, module: &mut BirthdayModule) {
        let now = SystemCalendar::now();
        let clock = now
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();
        let date = now
            .format(format_description!("[weekday], [day] [month repr:long] [year]"))
            .unwrap_or_default();
        if let Some(region) = module.module_mut(CLOCK) {
            region.lines = vec![clock];
        }
        if let Some(region) = module.module_mut(CALENDAR) {
            region.lines = vec![date];
        }
    }

    /// Flips between the birthday page and a second page, suspending and
    /// resuming the plugin like a paging dashboard would.
    fn switch_page(&mut self, module: &mut BirthdayModule) {
        self.page = (self.page + 1) % 2;
        let on_birthday_page = self.page == 0;
        for (name, visible) in [
            (CLOCK, on_birthday_page),
            (CALENDAR, on_birthday_page),
            (NOTES, !on_birthday_page),
        ] {
            if let Some(region) = module.module_mut(name) {
                region.visible = visible;
            }
        }
        if on_birthday_page {
            module.on_resume();
        } else {
            module.on_suspend();
        }
        debug!(page = self.page, "page switched");
    }
}

fn run(mut module: BirthdayModule, bg: Rgb) -> Result<()> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;

    let mut dashboard = Dashboard::install(&mut module);
    module.start();
    let mut compositor = Compositor::new(bg);

    let started = Instant::now();
    let mut last_frame = Instant::now();
    const FRAME: Duration = Duration::from_nanos(1_000_000_000 / 60);

    loop {
        if event::poll(Duration::from_millis(1))? {
            match event::read()? {
                Event::Key(key) => {
                    if key.code == KeyCode::Char('q')
                        || key.code == KeyCode::Esc
                        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
                    {
                        break;
                    }
                    if key.code == KeyCode::Char('p') || key.code == KeyCode::Tab {
                        dashboard.switch_page(&mut module);
                    }
                }
                Event::Resize(cols, rows) => {
                    module.on_resize(cols, rows);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                _ => {}
            }
        }

        if last_frame.elapsed() < FRAME {
            continue;
        }
        last_frame = Instant::now();

        dashboard.refresh(&mut module);
        module.pump(started.elapsed());
        let layers = module.layers();
        compositor.render(&mut stdout, module.stage(), &layers, module.now())?;
    }
    module.stop();

    execute!(stdout, Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("could not load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(style) = cli.style {
        config.firework_style = style;
    }
    init_logging(&cli, &config)?;
    for problem in config.lint() {
        warn!("{problem}");
    }

    let calendar: Box<dyn Calendar> = match cli.date {
        Some(month_day) => {
            let year = SystemCalendar::now().year();
            let leap_year = time::util::is_leap_year(year);
            Box::new(FixedCalendar(CalendarDay::new(month_day, leap_year)))
        }
        None => Box::new(SystemCalendar),
    };
    info!(style = %config.firework_style, today = %calendar.today().month_day, "starting");

    let (cols, rows) = terminal::size()?;
    let module = BirthdayModule::new(config, Viewport::new(cols, rows), calendar, fastrand::Rng::new());
    run(module, cli.bg_color.unwrap_or((0, 0, 0)))
}
