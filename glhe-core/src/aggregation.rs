//! Module containing the load aggregation engine, which folds expired sub-hourly loads
//! into hourly buckets and expired hourly buckets into monthly buckets.

use crate::history::LoadHistory;
use crate::params::{DEGENERATE_STEP_HOURS, HOURS_PER_DAY};

impl LoadHistory {
    /// Rolls detail up into coarser buckets.  Runs every call, including while the
    /// field is idle, so zero loads are integrated like any other load.
    pub fn aggregate(&mut self) {
        if self.current_sim_time <= 0.0 {
            return;
        }
        let new_hour = self.prev_hour != self.loc_hour_of_day;
        if new_hour {
            let q_hr = self.hourly_average();
            self.qn_hr.push_front(q_hr);
            self.last_hour_n.push_front(self.n);
        }
        let hours_elapsed =
            (self.loc_day_of_sim as usize - 1) * HOURS_PER_DAY as usize + self.loc_hour_of_day as usize;
        if new_hour && hours_elapsed % self.params.hrs_per_month == 0 {
            let month = hours_elapsed / self.params.hrs_per_month;
            let q_month = self.monthly_average();
            self.set_monthly(month, q_month);
        }
        self.prev_hour = self.loc_hour_of_day;
    }

    /// Time-weighted average of the sub-hourly loads since the last hourly bucket closed
    fn hourly_average(&self) -> f64 {
        let limit = self.sub_hourly_count(1);
        let sum: f64 = (1..=limit)
            .map(|j| {
                self.qn_sub_hr.ago(j)
                    * (self.prev_time_steps.ago(j) - self.prev_time_steps.ago(j + 1)).abs()
            })
            .sum();
        let oldest = self.prev_time_steps.ago(limit + 1);
        let newest = self.prev_time_steps.ago(1);
        if newest != oldest {
            sum / (newest - oldest).abs()
        } else {
            sum / DEGENERATE_STEP_HOURS
        }
    }

    /// Mean of the most recent month of hourly loads
    fn monthly_average(&self) -> f64 {
        let hrs = self.params.hrs_per_month;
        (1..=hrs).map(|j| self.qn_hr.ago(j)).sum::<f64>() / hrs as f64
    }
}
