//! Module containing models for heat-carrier fluid properties.

use crate::imports::*;
use crate::utils::interpolate as interp;
use lazy_static::lazy_static;

lazy_static! {
    /// Shared table of liquid water properties
    pub static ref WATER: WaterProperties = WaterProperties::default();
}

/// Temperature-dependent properties of a heat-carrier fluid
pub trait FluidProperties {
    /// Density \[kg/m^3\] at `te` \[°C\]
    fn density(&self, te: f64) -> f64;
    /// Specific heat \[J/(kg*K)\] at `te` \[°C\]
    fn specific_heat(&self, te: f64) -> f64;
    /// Thermal conductivity \[W/(m*K)\] at `te` \[°C\]
    fn conductivity(&self, te: f64) -> f64;
    /// Dynamic viscosity \[Pa*s\] at `te` \[°C\]
    fn viscosity(&self, te: f64) -> f64;

    /// All properties at `te` \[°C\]
    fn state_at(&self, te: f64) -> FluidState {
        FluidState {
            density: self.density(te),
            specific_heat: self.specific_heat(te),
            conductivity: self.conductivity(te),
            viscosity: self.viscosity(te),
        }
    }
}

/// Fluid properties at a single temperature
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct FluidState {
    /// \[kg/m^3\]
    pub density: f64,
    /// \[J/(kg*K)\]
    pub specific_heat: f64,
    /// \[W/(m*K)\]
    pub conductivity: f64,
    /// \[Pa*s\]
    pub viscosity: f64,
}

impl FluidState {
    /// Prandtl number
    pub fn prandtl(&self) -> f64 {
        self.specific_heat * self.viscosity / self.conductivity
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.density > 0.0
                && self.specific_heat > 0.0
                && self.conductivity > 0.0
                && self.viscosity > 0.0,
            "fluid properties must all be positive: {self:?}"
        );
        Ok(())
    }
}

/// Loop fluid selection
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub enum Fluid {
    /// Liquid water, tabulated from 0 to 100 °C
    #[default]
    Water,
    /// Temperature-independent properties
    Constant(FluidState),
}

impl Fluid {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            Self::Water => Ok(()),
            Self::Constant(state) => state.validate(),
        }
    }
}

impl FluidProperties for Fluid {
    fn density(&self, te: f64) -> f64 {
        match self {
            Self::Water => WATER.density(te),
            Self::Constant(s) => s.density,
        }
    }

    fn specific_heat(&self, te: f64) -> f64 {
        match self {
            Self::Water => WATER.specific_heat(te),
            Self::Constant(s) => s.specific_heat,
        }
    }

    fn conductivity(&self, te: f64) -> f64 {
        match self {
            Self::Water => WATER.conductivity(te),
            Self::Constant(s) => s.conductivity,
        }
    }

    fn viscosity(&self, te: f64) -> f64 {
        match self {
            Self::Water => WATER.viscosity(te),
            Self::Constant(s) => s.viscosity,
        }
    }
}

/// Properties of liquid water at atmospheric pressure, clamped outside 0 to 100 °C.
///
/// Tabulated from standard liquid water property tables at 101.325 kPa.
#[derive(Clone, Debug, PartialEq)]
pub struct WaterProperties {
    /// Private array of temperatures [°C] at which properties are evaluated
    te_array_degc: Array1<f64>,
    /// Private density of water \[kg/m^3\]
    rho_array: Array1<f64>,
    /// Private specific heat of water \[J/(kg*K)\]
    c_p_array: Array1<f64>,
    /// Private thermal conductivity of water \[W/(m*K)\]
    k_array: Array1<f64>,
    /// Private dynamic viscosity of water \[Pa*s\]
    mu_array: Array1<f64>,
}

impl FluidProperties for WaterProperties {
    fn density(&self, te: f64) -> f64 {
        interp(&te, &self.te_array_degc, &self.rho_array, false)
    }

    fn specific_heat(&self, te: f64) -> f64 {
        interp(&te, &self.te_array_degc, &self.c_p_array, false)
    }

    fn conductivity(&self, te: f64) -> f64 {
        interp(&te, &self.te_array_degc, &self.k_array, false)
    }

    fn viscosity(&self, te: f64) -> f64 {
        interp(&te, &self.te_array_degc, &self.mu_array, false)
    }
}

impl Default for WaterProperties {
    fn default() -> Self {
        let te_array_degc = array![
            0., 5., 10., 15., 20., 25., 30., 35., 40., 50., 60., 70., 80., 90., 100.
        ];
        let rho_array = array![
            999.84, 999.97, 999.70, 999.10, 998.21, 997.05, 995.65, 994.03, 992.22, 988.03,
            983.20, 977.76, 971.79, 965.31, 958.35
        ];
        let c_p_array = array![
            4219.9, 4205.0, 4195.5, 4189.0, 4184.1, 4181.3, 4180.1, 4179.6, 4179.6, 4180.6,
            4184.3, 4189.9, 4196.8, 4205.1, 4215.7
        ];
        let k_array = array![
            0.5610, 0.5710, 0.5800, 0.5890, 0.5984, 0.6070, 0.6150, 0.6230, 0.6300, 0.6430,
            0.6540, 0.6630, 0.6700, 0.6750, 0.6790
        ];
        let mu_array = array![
            1.7914e-3, 1.5182e-3, 1.3060e-3, 1.1375e-3, 1.0016e-3, 0.8900e-3, 0.7972e-3,
            0.7191e-3, 0.6527e-3, 0.5465e-3, 0.4660e-3, 0.4035e-3, 0.3540e-3, 0.3146e-3,
            0.2818e-3
        ];

        Self {
            te_array_degc,
            rho_array,
            c_p_array,
            k_array,
            mu_array,
        }
    }
}
