//! Streak and star bookkeeping.
//!
//! `UserStats` is created at first login with zero counters and a fresh
//! threshold triple, mutated by completion toggles and by the daily rollover,
//! and never deleted while the account exists.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Three distinct ascending completion counts that earn 1, 2 and 3 stars.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "[u32; 3]", into = "[u32; 3]")]
pub struct Thresholds([u32; 3]);

impl Thresholds {
    pub const MIN: u32 = 2;
    pub const MAX: u32 = 9;

    /// Validate an explicit triple.
    pub fn new(values: [u32; 3]) -> Result<Self, RecordError> {
        let in_range = values.iter().all(|v| (Self::MIN..=Self::MAX).contains(v));
        let ascending = values[0] < values[1] && values[1] < values[2];
        if in_range && ascending {
            Ok(Self(values))
        } else {
            Err(RecordError::InvalidThresholds(
                values.iter().map(|&v| i64::from(v)).collect(),
            ))
        }
    }

    /// Draw three distinct values from `MIN..=MAX` without replacement.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let span = (Self::MAX - Self::MIN + 1) as usize;
        let mut picks = [0u32; 3];
        for (slot, index) in picks
            .iter_mut()
            .zip(rand::seq::index::sample(rng, span, 3).into_iter())
        {
            *slot = index as u32 + Self::MIN;
        }
        picks.sort_unstable();
        Self(picks)
    }

    pub fn values(&self) -> [u32; 3] {
        self.0
    }

    /// Stars earned for a completion count: 3, 2, 1 or 0.
    pub fn stars_for(&self, completed_today: u32) -> u8 {
        self.0
            .iter()
            .rev()
            .position(|&t| completed_today >= t)
            .map(|from_top| 3 - from_top as u8)
            .unwrap_or(0)
    }
}

impl TryFrom<[u32; 3]> for Thresholds {
    type Error = RecordError;

    fn try_from(values: [u32; 3]) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Thresholds> for [u32; 3] {
    fn from(t: Thresholds) -> Self {
        t.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    /// Consecutive days with at least one completion.
    pub streak: u32,
    /// Lifetime completions. Never decremented by un-completing.
    pub total_stars: u32,
    pub completed_today: u32,
    /// Local midnight (ms) of the day `completed_today` applies to. 0 = unset.
    pub current_day_timestamp: i64,
    /// When the last 12-hour cycle started (ms). 0 = never.
    pub last_cycle_timestamp: i64,
    pub thresholds: Thresholds,
}

impl UserStats {
    /// Zeroed stats for a first login on the day starting at `today`.
    pub fn fresh<R: Rng + ?Sized>(today: i64, rng: &mut R) -> Self {
        Self {
            streak: 0,
            total_stars: 0,
            completed_today: 0,
            current_day_timestamp: today,
            last_cycle_timestamp: 0,
            thresholds: Thresholds::random(rng),
        }
    }

    pub fn stars_today(&self) -> u8 {
        self.thresholds.stars_for(self.completed_today)
    }

    pub(crate) fn record_completion(&mut self) {
        self.completed_today += 1;
        self.total_stars += 1;
    }

    pub(crate) fn record_reopen(&mut self) {
        self.completed_today = self.completed_today.saturating_sub(1);
    }
}
