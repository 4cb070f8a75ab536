use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoringError};

const MINUTE_MS: u64 = 60 * 1000;
const DAY_MS: u64 = 24 * 60 * MINUTE_MS;

/// Tuning for one punishment calculator. Durations are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PunishmentParameters {
    /// Length of the first punishment.
    pub duration_ms: u64,
    /// Growth per repeated punishment, in percent of the previous one.
    pub increment_rate: u32,
    /// Upper bound for any punishment. Must be set; unbounded growth would
    /// turn behavioural scoring into a permanent ban.
    pub max_duration_ms: u64,
    pub enabled: bool,
}

impl Default for PunishmentParameters {
    fn default() -> Self {
        Self {
            duration_ms: 10 * MINUTE_MS,
            increment_rate: 10,
            max_duration_ms: 7 * DAY_MS,
            enabled: true,
        }
    }
}

impl PunishmentParameters {
    pub fn new(duration: Duration, increment_rate: u32, max_duration: Duration) -> Self {
        Self {
            duration_ms: duration.as_millis() as u64,
            increment_rate,
            max_duration_ms: max_duration.as_millis() as u64,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_duration_ms == 0 {
            return Err(ScoringError::InvalidPunishmentParameters(
                "max_duration_ms must be greater than zero".to_string(),
            ));
        }
        if self.enabled && self.duration_ms == 0 {
            return Err(ScoringError::InvalidPunishmentParameters(
                "duration_ms must be greater than zero when punishment is enabled".to_string(),
            ));
        }
        if self.max_duration_ms < self.duration_ms {
            return Err(ScoringError::InvalidPunishmentParameters(format!(
                "max_duration_ms {} is below duration_ms {}",
                self.max_duration_ms, self.duration_ms
            )));
        }
        Ok(())
    }
}

/// Maps a peer's punishment history to the length of its next punishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunishmentCalculator {
    parameters: PunishmentParameters,
}

impl PunishmentCalculator {
    pub fn new(parameters: PunishmentParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &PunishmentParameters {
        &self.parameters
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.parameters.max_duration_ms)
    }

    /// Duration of punishment number `punishment_counter` (1 for the first).
    pub fn calculate(&self, punishment_counter: u32, score: i64) -> Duration {
        self.calculate_with_base(
            Duration::from_millis(self.parameters.duration_ms),
            punishment_counter,
            score,
        )
    }

    /// Same as [`PunishmentCalculator::calculate`] with the first-punishment
    /// length replaced by `base`.
    pub fn calculate_with_base(&self, base: Duration, punishment_counter: u32, score: i64) -> Duration {
        if !self.parameters.enabled {
            return Duration::ZERO;
        }

        let max = self.parameters.max_duration_ms as u128;
        let rate = 100 + self.parameters.increment_rate as u128;
        let mut result = base.as_millis();

        for _ in 1..punishment_counter {
            let next = result.saturating_mul(rate) / 100;
            // capped or no longer growing
            if result >= max || next == result {
                break;
            }
            result = next;
        }

        if score < 0 {
            result = result.saturating_mul(score.unsigned_abs() as u128);
        }

        Duration::from_millis(result.min(max) as u64)
    }
}
