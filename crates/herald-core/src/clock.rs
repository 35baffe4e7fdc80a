//! Game clock.
//!
//! Simulated time is a calendar date the host advances once per tick. No
//! component reads the wall clock for simulated delays; the clock below is
//! the single source of the current game date in the engine binary.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::config::ClockConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The tick counter or the calendar would overflow.
    #[error("clock overflow: cannot advance past tick {tick}")]
    Overflow {
        /// Tick at which advancing failed.
        tick: u64,
    },

    /// Invalid clock configuration.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Tick counter plus the game date it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameClock {
    tick: u64,
    now: NaiveDateTime,
    step: TimeDelta,
}

impl GameClock {
    /// Start a clock at midnight on `start`.
    pub fn new(start: NaiveDate, config: &ClockConfig) -> Result<Self, ClockError> {
        if config.game_hours_per_tick == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "game_hours_per_tick must be at least 1".to_owned(),
            });
        }
        let step = TimeDelta::try_hours(i64::from(config.game_hours_per_tick)).ok_or_else(|| {
            ClockError::InvalidConfig {
                reason: "game_hours_per_tick is out of range".to_owned(),
            }
        })?;
        Ok(Self {
            tick: 0,
            now: start.and_time(chrono::NaiveTime::MIN),
            step,
        })
    }

    /// Ticks elapsed since the start.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current game date.
    pub const fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Game time per tick.
    pub const fn step(&self) -> TimeDelta {
        self.step
    }

    /// Advance one tick and return the new game date.
    pub fn advance(&mut self) -> Result<NaiveDateTime, ClockError> {
        let overflow = ClockError::Overflow { tick: self.tick };
        let tick = self.tick.checked_add(1).ok_or(overflow)?;
        let now = self
            .now
            .checked_add_signed(self.step)
            .ok_or(ClockError::Overflow { tick: self.tick })?;
        self.tick = tick;
        self.now = now;
        Ok(now)
    }
}
