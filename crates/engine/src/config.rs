use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Per-pilot duty limits. Both values must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DutyLimits {
    pub max_daily_hours: f64,
    pub min_rest_hours: f64,
}

impl Default for DutyLimits {
    fn default() -> Self {
        DutyLimits {
            max_daily_hours: 8.0,
            min_rest_hours: 10.0,
        }
    }
}

impl DutyLimits {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.max_daily_hours.is_nan() || self.max_daily_hours <= 0.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "maxDailyHours must be positive, got {}",
                self.max_daily_hours
            )));
        }
        if self.min_rest_hours.is_nan() || self.min_rest_hours <= 0.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "minRestHours must be positive, got {}",
                self.min_rest_hours
            )));
        }
        Ok(())
    }
}

/// Tunables shared by the runway and pilot schedulers. Every field has a
/// default, so callers only send what they want to change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    /// Step between delay offsets probed by the constrained scheduler.
    pub delay_increment_mins: u32,
    /// Probing stops before this offset; past it a flight goes after the last booking.
    pub max_delay_mins: u32,
    /// Ground/prep time added to runway occupancy when charging pilot duty.
    pub prep_buffer_mins: u32,
    /// Limits given to pilots built by `create_pilots` and used by validation.
    pub duty: DutyLimits,
    /// Multi-day only: keep each pilot's last flight end across day boundaries
    /// so the rest requirement is enforced over midnight.
    pub carry_rest_across_days: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            delay_increment_mins: 15,
            max_delay_mins: 240,
            prep_buffer_mins: 30,
            duty: DutyLimits::default(),
            carry_rest_across_days: false,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.delay_increment_mins == 0 {
            return Err(ScheduleError::InvalidConfig(
                "delayIncrementMins must be positive".to_string(),
            ));
        }
        if self.delay_increment_mins > self.max_delay_mins {
            return Err(ScheduleError::InvalidConfig(format!(
                "delayIncrementMins ({}) exceeds maxDelayMins ({})",
                self.delay_increment_mins, self.max_delay_mins
            )));
        }
        self.duty.validate()
    }
}
