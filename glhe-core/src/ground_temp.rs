//! Module containing undisturbed (far-field) ground temperature models.

use crate::imports::*;
use crate::params::{DAYS_PER_YEAR, SECS_PER_HOUR};

/// Undisturbed ground temperature as a function of depth and time
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum GroundTempModel {
    /// Uniform temperature \[°C\] at all depths and times
    Constant { temperature: f64 },
    KusudaAchenbach(KusudaAchenbach),
}

impl Default for GroundTempModel {
    fn default() -> Self {
        Self::Constant { temperature: 13.0 }
    }
}

impl GroundTempModel {
    /// Ground temperature \[°C\]
    ///
    /// # Arguments
    ///
    /// * `depth` - depth below the surface \[m\]
    /// * `time` - time since the start of the year \[s\]
    ///
    pub fn temp_at(&self, depth: f64, time: f64) -> f64 {
        match self {
            Self::Constant { temperature } => *temperature,
            Self::KusudaAchenbach(ka) => ka.temp_at(depth, time),
        }
    }

    /// Mean of the model over a borehole at the top, quarter, half, three-quarter and
    /// bottom depths
    pub fn borehole_average(&self, top_depth: f64, length: f64, time: f64) -> f64 {
        [0.0, 1.0, 0.25, 0.5, 0.75]
            .iter()
            .map(|frac| self.temp_at(top_depth + frac * length, time))
            .sum::<f64>()
            / 5.0
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            Self::Constant { temperature } => {
                ensure!(temperature.is_finite(), "ground temperature must be finite");
                Ok(())
            }
            Self::KusudaAchenbach(ka) => ka.validate(),
        }
    }
}

/// Kusuda-Achenbach annual sinusoid damped with depth
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KusudaAchenbach {
    /// Soil thermal conductivity \[W/(m*K)\]
    pub soil_k: f64,
    /// Soil density \[kg/m^3\]
    pub soil_rho: f64,
    /// Soil specific heat \[J/(kg*K)\]
    pub soil_cp: f64,
    /// Annual average surface temperature \[°C\]
    pub avg_surface_temp: f64,
    /// Amplitude of the annual surface temperature swing \[K\]
    pub amplitude: f64,
    /// Day of year of the minimum surface temperature
    pub phase_shift_days: f64,
}

impl KusudaAchenbach {
    /// Soil diffusivity \[m^2/day\]
    fn diffusivity_per_day(&self) -> f64 {
        self.soil_k / (self.soil_rho * self.soil_cp) * SECS_PER_HOUR * 24.0
    }

    pub fn temp_at(&self, depth: f64, time: f64) -> f64 {
        let alpha = self.diffusivity_per_day();
        let t_days = time / (SECS_PER_HOUR * 24.0);
        let damping = (-depth * (PI / (DAYS_PER_YEAR * alpha)).sqrt()).exp();
        let lag = depth / 2.0 * (DAYS_PER_YEAR / (PI * alpha)).sqrt();
        self.avg_surface_temp
            - self.amplitude
                * damping
                * (2.0 * PI / DAYS_PER_YEAR * (t_days - self.phase_shift_days - lag)).cos()
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.soil_k > 0.0 && self.soil_rho > 0.0 && self.soil_cp > 0.0,
            "Kusuda-Achenbach soil properties must be positive"
        );
        ensure!(self.amplitude >= 0.0, "surface temperature amplitude must not be negative");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_model() -> KusudaAchenbach {
        KusudaAchenbach {
            soil_k: 1.8,
            soil_rho: 920.0,
            soil_cp: 2200.0,
            avg_surface_temp: 15.5,
            amplitude: 3.2,
            phase_shift_days: 8.0,
        }
    }

    #[test]
    fn test_surface_temperature_follows_annual_cycle() {
        let ka = test_model();
        let day = SECS_PER_HOUR * 24.0;
        assert_near!(ka.temp_at(0.0, 8.0 * day), 15.5 - 3.2, 1e-9);
        assert_near!(ka.temp_at(0.0, (8.0 + 365.0 / 2.0) * day), 15.5 + 3.2, 1e-9);
        assert_near!(ka.temp_at(0.0, (8.0 + 365.0 / 4.0) * day), 15.5, 1e-9);
    }

    #[test]
    fn test_deep_ground_approaches_average() {
        let ka = test_model();
        for day in [0.0, 100.0, 200.0, 300.0] {
            let t = ka.temp_at(50.0, day * SECS_PER_HOUR * 24.0);
            assert_near!(t, 15.5, 1e-3);
        }
        let swing = |depth: f64| {
            (0..365)
                .map(|d| ka.temp_at(depth, d as f64 * SECS_PER_HOUR * 24.0))
                .fold(f64::NEG_INFINITY, f64::max)
                - 15.5
        };
        assert!(swing(1.0) < swing(0.0));
        assert!(swing(3.0) < swing(1.0));
    }

    #[test]
    fn test_borehole_average() {
        let constant = GroundTempModel::Constant { temperature: 13.375 };
        assert_eq!(constant.borehole_average(1.0, 100.0, 0.0), 13.375);

        let ka = GroundTempModel::KusudaAchenbach(test_model());
        let avg = ka.borehole_average(1.0, 100.0, 0.0);
        let manual = [1.0, 101.0, 26.0, 51.0, 76.0]
            .iter()
            .map(|&z| ka.temp_at(z, 0.0))
            .sum::<f64>()
            / 5.0;
        assert_near!(avg, manual, 1e-12);
    }

    #[test]
    fn test_model_from_yaml() {
        let yaml = "!KusudaAchenbach\nsoil_k: 1.8\nsoil_rho: 920.0\nsoil_cp: 2200.0\navg_surface_temp: 15.5\namplitude: 3.2\nphase_shift_days: 8.0\n";
        let model: GroundTempModel = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(model, GroundTempModel::KusudaAchenbach(test_model()));
        assert!(model.validate().is_ok());
    }
}
