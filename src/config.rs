//! Plugin configuration, read from TOML.
//!
//! ```toml
//! firework_duration = 30000        # or "infinite"
//! confetti_duration = "infinite"
//! startup_delay = 2000
//! firework_style = "glow"
//! language = "sv"
//!
//! [[birthdays]]
//! name = "Alice"
//! date = "03-15"
//!
//! [translations.sv]
//! MESSAGES = ["Grattis på födelsedagen, {name}!"]
//! ```
//!
//! The camelCase key names used by dashboard configs (`fireworkDuration`,
//! `startupDelay`, ...) are accepted as aliases.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::date::MonthDay;
use crate::effects::FireworkStyle;
use crate::error::{ConfigError, DateError};
use crate::i18n::Translation;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Birthday {
    pub name: String,
    pub date: String,
}

impl Birthday {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
        }
    }

    pub fn month_day(&self) -> Result<MonthDay, DateError> {
        self.date.parse()
    }
}

/// The `birthdays` key. Anything that is not a list of `{name, date}` tables
/// is kept as `Malformed` so the checker can log it and skip the cycle
/// instead of the whole config failing to load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BirthdayEntries {
    List(Vec<Birthday>),
    Malformed(toml::Value),
}

impl Default for BirthdayEntries {
    fn default() -> Self {
        BirthdayEntries::List(Vec::new())
    }
}

/// How long fireworks or confetti keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawDuration")]
pub enum EffectDuration {
    Finite(Duration),
    #[default]
    Infinite,
}

impl EffectDuration {
    pub fn millis(ms: u64) -> Self {
        EffectDuration::Finite(Duration::from_millis(ms))
    }

    /// Absolute end time for an effect starting at `now`; `None` is unbounded.
    pub fn deadline(&self, now: Duration) -> Option<Duration> {
        match self {
            EffectDuration::Finite(d) => Some(now + *d),
            EffectDuration::Infinite => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Millis(i64),
    Word(String),
}

impl TryFrom<RawDuration> for EffectDuration {
    type Error = ConfigError;

    fn try_from(raw: RawDuration) -> Result<Self, Self::Error> {
        match raw {
            RawDuration::Millis(ms) if ms > 0 => Ok(EffectDuration::millis(ms as u64)),
            RawDuration::Millis(ms) => Err(ConfigError::Duration(ms.to_string())),
            RawDuration::Word(word) if word.eq_ignore_ascii_case("infinite") => {
                Ok(EffectDuration::Infinite)
            }
            RawDuration::Word(word) => Err(ConfigError::Duration(word)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub birthdays: BirthdayEntries,
    #[serde(alias = "fireworkDuration")]
    pub firework_duration: EffectDuration,
    #[serde(alias = "confettiDuration")]
    pub confetti_duration: EffectDuration,
    /// Milliseconds before the first birthday check.
    #[serde(alias = "startupDelay")]
    pub startup_delay: u64,
    pub debug: bool,
    pub language: String,
    #[serde(alias = "fireworkStyle")]
    pub firework_style: FireworkStyle,
    /// language -> key -> text or list of texts
    pub translations: BTreeMap<String, BTreeMap<String, Translation>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            birthdays: BirthdayEntries::default(),
            firework_duration: EffectDuration::Infinite,
            confetti_duration: EffectDuration::Infinite,
            startup_delay: 2000,
            debug: false,
            language: "en".to_string(),
            firework_style: FireworkStyle::default(),
            translations: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay)
    }

    /// Configured birthdays, or `None` when the key is malformed.
    pub fn birthdays(&self) -> Option<&[Birthday]> {
        match &self.birthdays {
            BirthdayEntries::List(list) => Some(list),
            BirthdayEntries::Malformed(_) => None,
        }
    }

    /// Problems that do not stop loading: malformed or unparsable birthdays
    /// and dates shadowed by an earlier record. [`Config::load`] does not
    /// report them; the host logs them once its subscriber is up.
    pub fn lint(&self) -> Vec<String> {
        let list = match &self.birthdays {
            BirthdayEntries::List(list) => list,
            BirthdayEntries::Malformed(value) => {
                return vec![format!(
                    "birthdays must be a list of {{name, date}} tables, got {}",
                    value.type_str()
                )];
            }
        };

        let mut problems = Vec::new();
        let mut seen: Vec<(MonthDay, &str)> = Vec::new();
        for birthday in list {
            match birthday.month_day() {
                Ok(day) => match seen.iter().find(|(d, _)| *d == day) {
                    Some((_, first)) => problems.push(format!(
                        "{} shares {} with {}; only {} will be celebrated",
                        birthday.name, birthday.date, first, first
                    )),
                    None => seen.push((day, &birthday.name)),
                },
                Err(err) => problems.push(format!("birthday for {}: {err}", birthday.name)),
            }
        }
        problems
    }
}
