//! Module containing the borehole internal thermal resistance model.
//!
//! Pipe conduction and convection combine into the pipe resistance, which feeds the
//! first-order multipole expressions for the grout and the effective borehole resistance
//! (Javed & Spitler 2016, "Accuracy of borehole thermal resistance calculation methods
//! for grouted single U-tube ground heat exchangers").

use crate::borehole::{BoreholeProps, PipeProps, ThermalProps};
use crate::fluid::FluidState;
use crate::imports::*;

/// Nusselt number for fully developed laminar flow, mean of the constant wall temperature
/// and constant heat flux values
pub const NU_LAMINAR: f64 = 4.01;

/// Darcy friction factor in a smooth tube (Petukhov), with a logistic blend between
/// the laminar and turbulent correlations for 1500 <= Re < 5000
pub fn friction_factor(reynolds: f64) -> f64 {
    let f_high = |re: f64| (0.79 * re.ln() - 1.64).powi(-2);
    if reynolds < 1500.0 {
        64.0 / reynolds
    } else if reynolds < 5000.0 {
        let sf = 1.0 / (1.0 + (-(reynolds - 3000.0) / 450.0).exp());
        (1.0 - sf) * 64.0 / reynolds + sf * f_high(reynolds)
    } else {
        f_high(reynolds)
    }
}

/// Conduction resistance \[m*K/W\] through the pipe wall
pub fn pipe_conduction_resistance(pipe: &PipeProps) -> f64 {
    (pipe.outer_diameter / pipe.inner_diameter()).ln() / (2.0 * PI * pipe.k)
}

/// Convection resistance \[m*K/W\] inside one U-tube leg (Gnielinski), blended with the
/// laminar value for 2000 <= Re < 4000.  Stagnant flow has no convection and returns
/// [`f64::INFINITY`].
///
/// # Arguments
///
/// * `pipe` - pipe geometry
/// * `fluid` - fluid properties at the inlet temperature
/// * `bh_mass_flow` - mass flow rate through a single borehole \[kg/s\]
///
pub fn pipe_convection_resistance(pipe: &PipeProps, fluid: &FluidState, bh_mass_flow: f64) -> f64 {
    if bh_mass_flow <= 0.0 {
        return f64::INFINITY;
    }
    let d_i = pipe.inner_diameter();
    let reynolds = 4.0 * bh_mass_flow / (fluid.viscosity * PI * d_i);
    let gnielinski = || {
        let f = friction_factor(reynolds);
        let pr = fluid.prandtl();
        (f / 8.0) * (reynolds - 1000.0) * pr
            / (1.0 + 12.7 * (f / 8.0).sqrt() * (pr.powf(2.0 / 3.0) - 1.0))
    };
    let nusselt = if reynolds < 2000.0 {
        NU_LAMINAR
    } else if reynolds < 4000.0 {
        let sf = 1.0 / (1.0 + (-(reynolds - 3000.0) / 150.0).exp());
        (1.0 - sf) * NU_LAMINAR + sf * gnielinski()
    } else {
        gnielinski()
    };
    let h = nusselt * fluid.conductivity / d_i;
    1.0 / (h * PI * d_i)
}

/// Dimensionless ratios of the first-order multipole method
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MultipoleGeometry {
    /// Shank spacing over borehole diameter
    pub theta_1: f64,
    /// Borehole radius over pipe outer radius
    pub theta_2: f64,
    /// `1 / (2 * theta_1 * theta_2)`
    pub theta_3: f64,
    /// `(k_grout - k_soil) / (k_grout + k_soil)`
    pub sigma: f64,
    /// Grout conductivity \[W/(m*K)\]
    pub k_grout: f64,
}

impl MultipoleGeometry {
    pub fn new(borehole: &BoreholeProps, soil: &ThermalProps) -> Self {
        let theta_1 = borehole.u_tube_dist / (2.0 * borehole.radius());
        let theta_2 = borehole.radius() / borehole.pipe.outer_radius();
        let k_grout = borehole.grout.k;
        Self {
            theta_1,
            theta_2,
            theta_3: 1.0 / (2.0 * theta_1 * theta_2),
            sigma: (k_grout - soil.k) / (k_grout + soil.k),
            k_grout,
        }
    }

    fn beta(&self, pipe_resistance: f64) -> f64 {
        2.0 * PI * self.k_grout * pipe_resistance
    }

    /// Average fluid-to-borehole-wall resistance \[m*K/W\]
    pub fn average_resistance(&self, pipe_resistance: f64) -> f64 {
        let beta = self.beta(pipe_resistance);
        let (t1, t2, t3, sigma) = (self.theta_1, self.theta_2, self.theta_3, self.sigma);
        let t1_4 = t1.powi(4);
        let term_1 = (t2 / (2.0 * t1 * (1.0 - t1_4).powf(sigma))).ln();
        let num_2 = t3.powi(2) * (1.0 - 4.0 * sigma * t1_4 / (1.0 - t1_4)).powi(2);
        let den_2 = (1.0 + beta) / (1.0 - beta)
            + t3.powi(2) * (1.0 + 16.0 * sigma * t1_4 / (1.0 - t1_4).powi(2));
        1.0 / (4.0 * PI * self.k_grout) * (beta + term_1 - num_2 / den_2)
    }

    /// Total leg-to-leg internal resistance \[m*K/W\]
    pub fn total_internal_resistance(&self, pipe_resistance: f64) -> f64 {
        let beta = self.beta(pipe_resistance);
        let (t1, t3, sigma) = (self.theta_1, self.theta_3, self.sigma);
        let t1_2 = t1.powi(2);
        let t1_4 = t1.powi(4);
        let term_1 = ((1.0 + t1_2).powf(sigma) / (t3 * (1.0 - t1_2).powf(sigma))).ln();
        let num_2 = t3.powi(2) * (1.0 - t1_4 + 4.0 * sigma * t1_2).powi(2);
        let den_2 = (1.0 + beta) / (1.0 - beta) * (1.0 - t1_4).powi(2)
            - t3.powi(2) * (1.0 - t1_4).powi(2)
            + 8.0 * sigma * t1_2 * t3.powi(2) * (1.0 + t1_4);
        1.0 / (PI * self.k_grout) * (beta + term_1 - num_2 / den_2)
    }

    /// Grout resistance \[m*K/W\]
    pub fn grout_resistance(&self, pipe_resistance: f64) -> f64 {
        self.average_resistance(pipe_resistance) - pipe_resistance / 2.0
    }
}

/// Effective borehole resistance for a field of identical boreholes
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResistanceModel {
    pub borehole: BoreholeProps,
    pub geometry: MultipoleGeometry,
    pub num_boreholes: usize,
}

impl ResistanceModel {
    pub fn new(borehole: BoreholeProps, soil: &ThermalProps, num_boreholes: usize) -> Self {
        Self {
            geometry: MultipoleGeometry::new(&borehole, soil),
            borehole,
            num_boreholes,
        }
    }

    pub fn pipe_conduction_resistance(&self) -> f64 {
        pipe_conduction_resistance(&self.borehole.pipe)
    }

    /// Convection resistance with `mass_flow` \[kg/s\] split evenly over the field
    pub fn pipe_convection_resistance(&self, mass_flow: f64, fluid: &FluidState) -> f64 {
        pipe_convection_resistance(
            &self.borehole.pipe,
            fluid,
            mass_flow / self.num_boreholes as f64,
        )
    }

    /// Conduction plus convection resistance of one pipe
    pub fn pipe_resistance(&self, mass_flow: f64, fluid: &FluidState) -> f64 {
        self.pipe_conduction_resistance() + self.pipe_convection_resistance(mass_flow, fluid)
    }

    pub fn bh_average_resistance(&self, mass_flow: f64, fluid: &FluidState) -> f64 {
        self.geometry
            .average_resistance(self.pipe_resistance(mass_flow, fluid))
    }

    pub fn bh_total_internal_resistance(&self, mass_flow: f64, fluid: &FluidState) -> f64 {
        self.geometry
            .total_internal_resistance(self.pipe_resistance(mass_flow, fluid))
    }

    pub fn bh_grout_resistance(&self, mass_flow: f64, fluid: &FluidState) -> f64 {
        self.geometry
            .grout_resistance(self.pipe_resistance(mass_flow, fluid))
    }

    /// Effective borehole resistance \[m*K/W\] assuming uniform heat flux along the
    /// borehole.  Zero when the field is stagnant.
    ///
    /// # Arguments
    ///
    /// * `mass_flow` - total field mass flow rate \[kg/s\]
    /// * `fluid` - fluid properties at the inlet temperature
    ///
    pub fn hx_resistance(&self, mass_flow: f64, fluid: &FluidState) -> f64 {
        if mass_flow <= 0.0 {
            return 0.0;
        }
        let rp = self.pipe_resistance(mass_flow, fluid);
        let r_a = self.geometry.total_internal_resistance(rp);
        self.geometry.average_resistance(rp)
            + 1.0 / (3.0 * r_a)
                * (self.borehole.length / (mass_flow * fluid.specific_heat)).powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::borehole::tests::test_borehole;
    use crate::fluid::{FluidProperties, WATER};

    const RP: f64 = 0.05;

    fn geometry(bh_diameter: f64, u_tube_dist: f64, k_grout: f64, k_soil: f64) -> MultipoleGeometry {
        let mut bh = test_borehole();
        bh.diameter = bh_diameter;
        bh.u_tube_dist = u_tube_dist;
        bh.grout.k = k_grout;
        bh.pipe.outer_diameter = 0.032;
        let soil = ThermalProps {
            k: k_soil,
            rho_cp: 2.0e6,
        };
        MultipoleGeometry::new(&bh, &soil)
    }

    #[test]
    fn test_friction_factor_regimes() {
        for re in [100.0, 1000.0, 1400.0] {
            assert_near!(friction_factor(re), 64.0 / re, 1e-12);
        }
        for re in [5000.0, 15000.0, 25000.0] {
            assert_near!(friction_factor(re), (0.79 * f64::ln(re) - 1.64).powi(-2), 1e-12);
        }
        assert_near!(friction_factor(2000.0), 0.034003503, 1e-6);
        assert_near!(friction_factor(3000.0), 0.033446219, 1e-6);
        assert_near!(friction_factor(4000.0), 0.03895358, 1e-6);
    }

    #[test]
    fn test_friction_factor_blend_is_continuous() {
        let eps = 1e-6;
        for re in [2000.0, 4000.0] {
            let jump = (friction_factor(re + eps) - friction_factor(re - eps)).abs();
            assert!(jump < 1e-8, "jump of {jump} at Re = {re}");
        }
    }

    #[test]
    fn test_pipe_conduction_resistance() {
        let pipe = PipeProps {
            outer_diameter: 0.0267,
            thickness: 0.00243,
            k: 0.389,
            rho_cp: 1.77e6,
        };
        assert_near!(pipe_conduction_resistance(&pipe), 0.082204, 1e-5);
    }

    #[test]
    fn test_pipe_convection_resistance() {
        let pipe = test_borehole().pipe;
        let water = WATER.state_at(20.0);
        assert_near!(
            pipe_convection_resistance(&pipe, &water, 0.01),
            1.0 / (NU_LAMINAR * water.conductivity * PI),
            1e-12
        );
        assert_near!(pipe_convection_resistance(&pipe, &water, 0.05), 0.060882, 1e-5);
        assert_near!(pipe_convection_resistance(&pipe, &water, 0.1), 0.011263, 1e-5);
        assert_near!(pipe_convection_resistance(&pipe, &water, 0.5), 0.0025818, 1e-6);
        assert_eq!(pipe_convection_resistance(&pipe, &water, 0.0), f64::INFINITY);
    }

    #[test]
    fn test_grout_resistance() {
        let g = geometry(0.096, 0.032, 0.6, 4.0);
        assert_near!(g.theta_1, 0.33333, 1e-5);
        assert_near!(g.theta_2, 3.0, 1e-9);
        assert_near!(g.grout_resistance(RP), 0.17701, 1e-5);

        let g = geometry(0.096, 0.0426666667, 0.6, 1.0);
        assert_near!(g.theta_1, 0.44444, 1e-5);
        assert_near!(g.grout_resistance(RP), 0.14724, 1e-5);

        let g = geometry(0.288, 0.10666667, 1.8, 1.0);
        assert_near!(g.theta_1, 0.37037, 1e-5);
        assert_near!(g.theta_2, 9.0, 1e-9);
        assert_near!(g.grout_resistance(RP), 0.11038, 1e-5);
    }

    #[test]
    fn test_total_internal_resistance() {
        let g = geometry(0.096, 0.032, 0.6, 4.0);
        assert_near!(g.total_internal_resistance(RP), 0.32365, 1e-5);

        let g = geometry(0.192, 0.032, 3.6, 3.0);
        assert_near!(g.theta_1, 0.166667, 1e-6);
        assert_near!(g.theta_2, 6.0, 1e-9);
        assert_near!(g.total_internal_resistance(RP), 0.16310, 1e-5);

        let g = geometry(0.288, 0.1066667, 3.0, 1.0);
        assert_near!(g.total_internal_resistance(RP), 0.31582, 1e-5);
    }

    #[test]
    fn test_pipe_resistance_is_sum_of_parts() {
        let soil = ThermalProps {
            k: 2.423,
            rho_cp: 2.343e6,
        };
        let model = ResistanceModel::new(test_borehole(), &soil, 4);
        for te in [5.0, 20.0, 35.0] {
            let water = WATER.state_at(te);
            for flow in [0.04, 0.2, 0.4, 1.6, 8.0] {
                assert_eq!(
                    model.pipe_resistance(flow, &water),
                    model.pipe_conduction_resistance()
                        + model.pipe_convection_resistance(flow, &water)
                );
            }
        }
    }

    #[test]
    fn test_hx_resistance() {
        let soil = ThermalProps {
            k: 2.423,
            rho_cp: 2.343e6,
        };
        let model = ResistanceModel::new(test_borehole(), &soil, 4);
        let water = WATER.state_at(20.0);
        assert_eq!(model.hx_resistance(0.0, &water), 0.0);
        assert_eq!(model.hx_resistance(-1.0, &water), 0.0);
        let r_low = model.hx_resistance(0.2, &water);
        let r_high = model.hx_resistance(2.0, &water);
        assert!(r_low > r_high && r_high > 0.0);
        assert!(r_high > model.bh_average_resistance(2.0, &water));
        assert_near!(
            model.bh_grout_resistance(2.0, &water),
            model.bh_average_resistance(2.0, &water) - model.pipe_resistance(2.0, &water) / 2.0,
            1e-12
        );
    }
}
