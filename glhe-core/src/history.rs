//! Module containing the load history state of a borehole field.
//!
//! Every buffer is ordered most recent first and indexed by "how many steps ago",
//! starting from 1.

use std::collections::VecDeque;

use crate::imports::*;
use crate::params::{AggregationParams, HOURS_PER_DAY};

/// Fixed-capacity buffer where pushing a new value drops the oldest one
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShiftRegister<T> {
    values: VecDeque<T>,
}

impl<T: Copy + Default> ShiftRegister<T> {
    /// New register of `capacity` default values
    pub fn new(capacity: usize) -> Self {
        Self::filled(capacity, T::default())
    }

    pub fn filled(capacity: usize, value: T) -> Self {
        Self {
            values: std::iter::repeat(value).take(capacity).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Value pushed `n` pushes ago, where `ago(1)` is the most recent.
    /// Positions outside the register read as the default value.
    pub fn ago(&self, n: usize) -> T {
        n.checked_sub(1)
            .and_then(|i| self.values.get(i))
            .copied()
            .unwrap_or_default()
    }

    /// Inserts `value` as the most recent entry and drops the oldest
    pub fn push_front(&mut self, value: T) {
        if self.values.is_empty() {
            return;
        }
        self.values.pop_back();
        self.values.push_front(value);
    }

    /// Overwrites every entry with `value`
    pub fn fill(&mut self, value: T) {
        self.values.iter_mut().for_each(|v| *v = value);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}

/// Mutable load history of one field.  Loads are per unit borehole length \[W/m\] and
/// times are hours since the start of the environment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoadHistory {
    pub params: AggregationParams,
    /// Elapsed simulation time \[hr\]
    pub current_sim_time: f64,
    /// Timestep boundary times \[hr\]
    pub prev_time_steps: ShiftRegister<f64>,
    /// Number of elapsed timesteps
    pub n: usize,
    /// Value of `n` when a sub-hourly load was last shifted in
    pub prev_n: usize,
    /// Sub-hourly loads
    pub qn_sub_hr: ShiftRegister<f64>,
    /// Hourly loads
    pub qn_hr: ShiftRegister<f64>,
    /// Monthly loads, indexed by month starting from 1
    pub qn_monthly: Vec<f64>,
    /// Value of `n` when each hourly bucket closed
    pub last_hour_n: ShiftRegister<usize>,
    /// Load solved on the most recent call, shifted into `qn_sub_hr` on the next timestep
    pub last_qn_sub_hr: f64,
    /// Hour of day (1 to 24) of `current_sim_time`
    pub loc_hour_of_day: u32,
    /// Day of simulation (from 1) of `current_sim_time`
    pub loc_day_of_sim: u32,
    /// Hour of day at the previous aggregation
    pub prev_hour: u32,
}

impl LoadHistory {
    pub fn new(params: AggregationParams) -> Self {
        Self {
            current_sim_time: 0.0,
            prev_time_steps: ShiftRegister::new(params.sub_hourly_len()),
            n: 1,
            prev_n: 1,
            qn_sub_hr: ShiftRegister::new(params.sub_hourly_len()),
            qn_hr: ShiftRegister::new(params.hourly_len()),
            qn_monthly: vec![0.0; params.monthly_len()],
            last_hour_n: ShiftRegister::filled(params.last_hour_len(), 1),
            last_qn_sub_hr: 0.0,
            loc_hour_of_day: 1,
            loc_day_of_sim: 1,
            prev_hour: 1,
            params,
        }
    }

    /// Clears all history at the start of a new environment
    pub fn reset_environment(&mut self) {
        *self = Self::new(self.params);
    }

    /// Clears the history at the first day of a new design day.  `prev_n`, `prev_hour`
    /// and the last solved load carry over.
    pub fn reset_design_day(&mut self) {
        self.current_sim_time = 0.0;
        self.prev_time_steps.fill(0.0);
        self.qn_hr.fill(0.0);
        self.qn_monthly.iter_mut().for_each(|q| *q = 0.0);
        self.qn_sub_hr.fill(0.0);
        self.last_hour_n.fill(1);
        self.n = 1;
    }

    /// Sets the elapsed time \[hr\] and derives the local hour of day and day of simulation
    pub fn set_time(&mut self, hours: f64) {
        self.current_sim_time = hours;
        self.loc_hour_of_day = (hours.rem_euclid(HOURS_PER_DAY as f64) + 1.0) as u32;
        self.loc_day_of_sim = (hours / HOURS_PER_DAY as f64 + 1.0) as u32;
    }

    /// Records the current time as a timestep boundary if it is new, and shifts the last
    /// solved load into the sub-hourly history whenever the step count advances.
    /// Revisiting the same instant leaves the history untouched.
    pub fn record_time_step(&mut self) {
        if self.prev_time_steps.ago(1) != self.current_sim_time {
            self.prev_time_steps.push_front(self.current_sim_time);
            self.n += 1;
        }
        if self.n != self.prev_n {
            self.prev_n = self.n;
            self.qn_sub_hr.push_front(self.last_qn_sub_hr);
        }
    }

    /// Number of sub-hourly loads since the bucket `hours_ago` hours back closed
    pub fn sub_hourly_count(&self, hours_ago: usize) -> usize {
        self.n.saturating_sub(self.last_hour_n.ago(hours_ago))
    }

    /// Monthly load for `month`, counted from 1
    pub fn monthly(&self, month: usize) -> f64 {
        month
            .checked_sub(1)
            .and_then(|i| self.qn_monthly.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    pub(crate) fn set_monthly(&mut self, month: usize, load: f64) {
        let Some(i) = month.checked_sub(1) else {
            return;
        };
        if i >= self.qn_monthly.len() {
            log::debug!(
                "{}",
                format_dbg!((month, self.params.max_sim_years, "extending monthly history"))
            );
            self.qn_monthly.resize(i + 1, 0.0);
        }
        self.qn_monthly[i] = load;
    }

    /// True if every history buffer holds only zeros
    pub fn is_cleared(&self) -> bool {
        self.qn_sub_hr.iter().all(|q| *q == 0.0)
            && self.qn_hr.iter().all(|q| *q == 0.0)
            && self.qn_monthly.iter().all(|q| *q == 0.0)
    }
}
