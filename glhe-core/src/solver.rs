//! Module containing the superposition solver.
//!
//! Each call selects a [`Regime`] from the elapsed time and history, sums the temperature
//! response of every active history bucket, and solves the explicit heat balance of the
//! U-tube for the new load, average fluid temperature and outlet temperature.

use crate::gfunction::GFunctionTable;
use crate::history::LoadHistory;
use crate::imports::*;

/// Which history tiers take part in the superposition
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// No time has elapsed yet, nothing to solve
    Startup,
    /// No history exists, only the instantaneous response applies
    FirstStep,
    /// Sub-hourly and hourly loads only
    ShortHistory,
    /// Monthly, hourly and sub-hourly loads.  Monthly buckets up to and including
    /// `current_month` are superposed.
    LongHistory { current_month: usize },
}

impl Regime {
    pub fn select(history: &LoadHistory) -> Self {
        let t = history.current_sim_time;
        if t <= 0.0 {
            Self::Startup
        } else if history.n == 1 {
            Self::FirstStep
        } else if t < history.params.short_history_limit() {
            Self::ShortHistory
        } else {
            let p = &history.params;
            let num_months = ((t + 1.0) / p.hrs_per_month as f64) as usize;
            let current_month =
                if t < (num_months * p.hrs_per_month + p.agg + p.sub_agg) as f64 {
                    num_months.saturating_sub(1)
                } else {
                    num_months
                };
            Self::LongHistory { current_month }
        }
    }
}

/// Flow through the field during a solve
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum FlowState {
    Stagnant,
    Flowing {
        /// \[kg/s\]
        mass_flow_rate: f64,
        /// Fluid specific heat \[J/(kg*K)\]
        specific_heat: f64,
    },
}

impl FlowState {
    /// Any non-positive flow is stagnant
    pub fn new(mass_flow_rate: f64, specific_heat: f64) -> Self {
        if mass_flow_rate <= 0.0 {
            Self::Stagnant
        } else {
            Self::Flowing {
                mass_flow_rate,
                specific_heat,
            }
        }
    }
}

/// Ground thermal resistance \[m*K/W\] of a unit step load applied some hours ago
#[derive(Debug, Clone, Copy)]
pub struct ResponseFunction<'a> {
    pub table: &'a GFunctionTable,
    /// Field time scale \[hr\]
    pub time_scale: f64,
    pub bh_radius: f64,
    pub bh_length: f64,
    /// `2 * pi * k_soil` \[W/(m*K)\]
    pub k_ground_factor: f64,
}

impl ResponseFunction<'_> {
    pub fn resistance(&self, hours: f64) -> f64 {
        self.table
            .g_value(hours / self.time_scale, self.bh_radius, self.bh_length)
            / self.k_ground_factor
    }
}

/// Conditions for one solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverInputs {
    /// Undisturbed ground temperature \[°C\]
    pub ground_temp: f64,
    /// \[°C\]
    pub inlet_temp: f64,
    pub flow: FlowState,
    /// Effective borehole resistance \[m*K/W\]
    pub hx_resistance: f64,
    /// Total borehole length of the field \[m\]
    pub total_tube_length: f64,
}

/// Result of one solve
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub regime: Regime,
    /// Heat extracted from the ground per unit borehole length \[W/m\]
    pub load: f64,
    /// Ground temperature drop from all past loads \[K\]
    pub history_sum: f64,
    /// \[°C\]
    pub fluid_avg_temp: f64,
    /// \[°C\]
    pub outlet_temp: f64,
}

/// Temperature drop \[K\] at the borehole wall from all past loads.  Zero for
/// [`Regime::Startup`] and [`Regime::FirstStep`].
pub fn history_sum(history: &LoadHistory, regime: Regime, response: &ResponseFunction) -> f64 {
    match regime {
        Regime::Startup | Regime::FirstStep => 0.0,
        Regime::ShortHistory => short_history_sum(history, response),
        Regime::LongHistory { current_month } => long_history_sum(history, response, current_month),
    }
}

fn short_history_sum(history: &LoadHistory, response: &ResponseFunction) -> f64 {
    let t = history.current_sim_time;
    let t_int = t as usize;
    let sub_agg = history.params.sub_agg;
    let q_sub = |i: usize| history.qn_sub_hr.ago(i);
    let q_hr = |i: usize| history.qn_hr.ago(i);

    let idx_n = if t_int < sub_agg { t_int + 1 } else { sub_agg + 1 };
    let sub_limit = history.sub_hourly_count(idx_n);
    let mut sum_sub = 0.0;
    for i in 1..=sub_limit {
        let r = response.resistance(t - history.prev_time_steps.ago(i + 1));
        if i == sub_limit {
            sum_sub += if t_int >= sub_agg {
                (q_sub(i) - q_hr(idx_n)) * r
            } else {
                q_sub(i) * r
            };
        } else {
            sum_sub += (q_sub(i) - q_sub(i + 1)) * r;
        }
    }

    let mut sum_hr = 0.0;
    for i in (sub_agg + 1)..=t_int {
        if i == t_int {
            sum_hr += q_hr(i) * response.resistance(t);
        } else {
            sum_hr += (q_hr(i) - q_hr(i + 1)) * response.resistance(t - t_int as f64 + i as f64);
        }
    }

    sum_sub + sum_hr
}

fn long_history_sum(history: &LoadHistory, response: &ResponseFunction, current_month: usize) -> f64 {
    let t = history.current_sim_time;
    let t_int = t as usize;
    let p = &history.params;
    let q_sub = |i: usize| history.qn_sub_hr.ago(i);
    let q_hr = |i: usize| history.qn_hr.ago(i);
    let q_month = |i: usize| history.monthly(i);

    let mut sum_month = 0.0;
    for i in 1..=current_month {
        if i == 1 {
            sum_month += q_month(1) * response.resistance(t);
        } else {
            sum_month += (q_month(i) - q_month(i - 1))
                * response.resistance(t - ((i - 1) * p.hrs_per_month) as f64);
        }
    }

    let hr_limit = (t - (current_month * p.hrs_per_month) as f64) as usize;
    let mut sum_hr = 0.0;
    for i in (p.sub_agg + 1)..=hr_limit {
        let r = response.resistance(t - t_int as f64 + i as f64);
        if i == hr_limit {
            sum_hr += (q_hr(i) - q_month(current_month)) * r;
        } else {
            sum_hr += (q_hr(i) - q_hr(i + 1)) * r;
        }
    }

    let sub_limit = history.sub_hourly_count(p.sub_agg + 1);
    let mut sum_sub = 0.0;
    for i in 1..=sub_limit {
        let r = response.resistance(t - history.prev_time_steps.ago(i + 1));
        if i == sub_limit {
            sum_sub += (q_sub(i) - q_hr(p.sub_agg + 1)) * r;
        } else {
            sum_sub += (q_sub(i) - q_sub(i + 1)) * r;
        }
    }

    sum_month + sum_hr + sum_sub
}

/// Solves the explicit U-tube heat balance for the current timestep.  Returns `None` for
/// [`Regime::Startup`].
pub fn solve(
    history: &LoadHistory,
    regime: Regime,
    response: &ResponseFunction,
    inputs: &SolverInputs,
) -> Option<Solution> {
    let t = history.current_sim_time;
    let tg = inputs.ground_temp;
    let r_b = inputs.hx_resistance;
    let length = inputs.total_tube_length;

    let (load, history_sum, fluid_avg_temp, outlet_temp) = match (regime, inputs.flow) {
        (Regime::Startup, _) => return None,
        (Regime::FirstStep, FlowState::Stagnant) => (0.0, 0.0, tg, inputs.inlet_temp),
        (
            Regime::FirstStep,
            FlowState::Flowing {
                mass_flow_rate,
                specific_heat,
            },
        ) => {
            let r_g = response.resistance(t);
            let c_1 = length / (2.0 * mass_flow_rate * specific_heat);
            let q = (tg - inputs.inlet_temp) / (r_g + r_b + c_1);
            (q, 0.0, tg - q * r_b, tg - q * (r_g + r_b - c_1))
        }
        (_, flow) => {
            let sum_total = self::history_sum(history, regime, response);
            match flow {
                FlowState::Stagnant => (0.0, sum_total, tg - sum_total, inputs.inlet_temp),
                FlowState::Flowing {
                    mass_flow_rate,
                    specific_heat,
                } => {
                    let r_q = response.resistance(t - history.prev_time_steps.ago(2));
                    let c_0 = r_q;
                    let c_1 = tg - (sum_total - history.qn_sub_hr.ago(1) * r_q);
                    let c_2 = length / (2.0 * mass_flow_rate * specific_heat);
                    let c_3 = mass_flow_rate * specific_heat / length;
                    let q = (c_1 - inputs.inlet_temp) / (r_b + c_0 - c_2 + 1.0 / c_3);
                    (
                        q,
                        sum_total,
                        c_1 - (c_0 + r_b) * q,
                        c_1 + (c_2 - c_0 - r_b) * q,
                    )
                }
            }
        }
    };

    Some(Solution {
        regime,
        load,
        history_sum,
        fluid_avg_temp,
        outlet_temp,
    })
}
