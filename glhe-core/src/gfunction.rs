//! Module containing the g-function table and its interpolator.

use crate::imports::*;
use crate::utils::{interpolate_vectors, unsorted_positions};

/// Non-dimensional step response of a borehole field.
///
/// Pairs of `ln(t / t_s)` and `g` where `t_s = H^2 / (9 * alpha)` is the field's
/// characteristic diffusion time.  The table is shared read-only by every solver call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct GFunctionTable {
    /// Non-dimensional log-time, `ln(t / t_s)`, sorted ascending
    pub lntts: Vec<f64>,
    /// Non-dimensional temperature response at each `lntts`
    pub gfnc: Vec<f64>,
    /// Borehole radius to length ratio the table was produced for
    pub g_ref_ratio: f64,
}

impl SerdeAPI for GFunctionTable {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()
    }
}

impl GFunctionTable {
    /// Builds and validates a table
    ///
    /// # Arguments
    ///
    /// * `lntts` - non-dimensional log-times, sorted ascending
    /// * `gfnc` - g-function values at each log-time
    /// * `g_ref_ratio` - borehole radius to length ratio of the table
    ///
    pub fn new(lntts: Vec<f64>, gfnc: Vec<f64>, g_ref_ratio: f64) -> anyhow::Result<Self> {
        let table = Self {
            lntts,
            gfnc,
            g_ref_ratio,
        };
        table.validate()?;
        Ok(table)
    }

    /// Checks structural integrity.  Unsorted log-times are reported but not fatal.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.lntts.len() == self.gfnc.len(),
            "g-function table has {} log-times but {} values",
            self.lntts.len(),
            self.gfnc.len()
        );
        ensure!(
            self.lntts.len() >= 2,
            "g-function table needs at least 2 points, found {}",
            self.lntts.len()
        );
        ensure!(
            self.lntts.iter().chain(self.gfnc.iter()).all(|v| v.is_finite()),
            "g-function table contains non-finite values"
        );
        ensure!(
            self.g_ref_ratio > 0.0,
            "`g_ref_ratio` must be positive, found {}",
            self.g_ref_ratio
        );
        let unsorted = unsorted_positions(&self.lntts);
        if !unsorted.is_empty() {
            let pairs: Vec<String> = unsorted
                .iter()
                .map(|&i| format!("[{i}] {} > [{}] {}", self.lntts[i], i + 1, self.lntts[i + 1]))
                .collect();
            log::warn!(
                "g-function log-times are not sorted ascending, interpolated values will be wrong: {}",
                pairs.join(", ")
            );
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lntts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lntts.is_empty()
    }

    /// True if some sample sits at or below `lntts`, so lookups there need no extrapolation
    /// past the start of the table
    pub fn covers(&self, lntts: f64) -> bool {
        self.lntts.iter().any(|x| *x <= lntts)
    }

    /// Interpolated g-function at non-dimensional log-time `lntts`,
    /// extrapolating linearly beyond either end of the table
    pub fn interp(&self, lntts: f64) -> f64 {
        interpolate_vectors(&lntts, &self.lntts, &self.gfnc, true)
    }

    /// G-function at non-dimensional time `time` (not its logarithm), corrected for a
    /// borehole radius to length ratio that differs from the table's
    ///
    /// # Arguments
    ///
    /// * `time` - elapsed time over the field's time scale
    /// * `bh_radius` - borehole radius \[m\]
    /// * `bh_length` - borehole length \[m\]
    ///
    pub fn g_value(&self, time: f64, bh_radius: f64, bh_length: f64) -> f64 {
        let g = self.interp(time.ln());
        let ratio = bh_radius / bh_length;
        if ratio != self.g_ref_ratio {
            g - (bh_radius / (bh_length * self.g_ref_ratio)).ln()
        } else {
            g
        }
    }
}
