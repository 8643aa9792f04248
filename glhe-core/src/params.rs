//! Module containing GLHE model parameters.

use crate::imports::*;

/// Unit conversions that should NEVER change
pub const SECS_PER_HOUR: f64 = 3_600.0;
pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Temperature [°C] at which the design mass flow is evaluated at the start of an environment
pub const DESIGN_DENSITY_TEMP_DEGC: f64 = 20.0;
/// Fluid temperature change [K] across the field above which a diagnostic is emitted
pub const DELTA_T_WARNING_LIMIT: f64 = 100.0;
/// Default number of times the delta T diagnostic is emitted per field
pub const DEFAULT_MAX_WARNINGS: usize = 5;
/// Duration [hr] assumed for an hourly bucket when its boundary timestamps coincide
pub const DEGENERATE_STEP_HOURS: f64 = 0.05;

/// Load aggregation parameters.  Fixed once the field is set up.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct AggregationParams {
    /// Fixed length of an aggregation "month" \[hr\]
    pub hrs_per_month: usize,
    /// Maximum number of timesteps per hour
    pub max_ts_in_hr: usize,
    /// Number of hours of sub-hourly loads kept at full resolution
    pub sub_agg: usize,
    /// Number of hourly loads kept before monthly aggregation applies
    pub agg: usize,
    /// Maximum simulation length \[yr\], sizes the monthly buffer and g-function range
    pub max_sim_years: usize,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            hrs_per_month: 730,
            max_ts_in_hr: 60,
            sub_agg: 15,
            agg: 192,
            max_sim_years: 1,
        }
    }
}

impl SerdeAPI for AggregationParams {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()
    }
}

impl AggregationParams {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.hrs_per_month > 0, "`hrs_per_month` must be positive");
        ensure!(self.max_ts_in_hr > 0, "`max_ts_in_hr` must be positive");
        ensure!(self.sub_agg > 0, "`sub_agg` must be positive");
        ensure!(
            self.max_sim_years > 0,
            "`max_sim_years` must be at least 1"
        );
        ensure!(
            self.hrs_per_month > self.agg + self.sub_agg,
            "`hrs_per_month` ({}) must exceed `agg` + `sub_agg` ({})",
            self.hrs_per_month,
            self.agg + self.sub_agg
        );
        Ok(())
    }

    /// Elapsed time \[hr\] below which no monthly superposition is needed
    pub fn short_history_limit(&self) -> f64 {
        (self.hrs_per_month + self.agg + self.sub_agg) as f64
    }

    /// Capacity of the hourly load buffer
    pub fn hourly_len(&self) -> usize {
        self.hrs_per_month + self.agg + self.sub_agg
    }

    /// Capacity of the sub-hourly load and timestamp buffers
    pub fn sub_hourly_len(&self) -> usize {
        (self.sub_agg + 1) * self.max_ts_in_hr + 1
    }

    /// Capacity of the buffer of timestep counts at which hourly buckets closed
    pub fn last_hour_len(&self) -> usize {
        self.sub_agg + 1
    }

    pub fn monthly_len(&self) -> usize {
        self.max_sim_years * 12
    }
}
