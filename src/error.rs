//! Error types for the celebration overlay.
//!
//! None of these ever reach the host: every failure is logged and degrades to
//! "the effect stops early or never starts".

use thiserror::Error;

/// Problems with a drawing surface or a draw call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    /// The viewport has no area to draw on.
    #[error("viewport has no drawable area ({columns}x{rows} cells)")]
    EmptyViewport { columns: u16, rows: u16 },

    /// The surface was discarded by cleanup and cannot be drawn on again.
    #[error("surface {0} was discarded")]
    Discarded(u32),

    /// A draw call received NaN or infinite geometry.
    #[error("non-finite geometry in {0}")]
    NonFinite(&'static str),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration {0:?}: expected a positive number of milliseconds or \"infinite\"")]
    Duration(String),
}

/// A string that is not a zero-padded `MM-DD` date.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid month-day {input:?}: {reason}")]
pub struct DateError {
    pub input: String,
    pub reason: &'static str,
}

/// Translation lookup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("no catalog loaded for language {0:?}")]
    UnknownLanguage(String),
}
