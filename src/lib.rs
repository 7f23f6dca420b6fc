//! A text scramble animation engine.
//!
//! An element transitions to a target string by passing every position through a window of
//! randomized substitute glyphs before settling on the final character. Engines are driven by a
//! cooperative [scramble::FrameQueue] and owned by a [trigger::TriggerController], which maps
//! pointer and tab activation events to engine starts and stops.

pub mod config;
pub mod scramble;
pub mod terminal;
pub mod trigger;

pub use config::{Config, ConfigError, RepeatMode, ScrambleOptions};
pub use trigger::{GroupId, TriggerController};
