//! Module containing borehole geometry, material properties and field layouts.

use crate::imports::*;

/// Thermal properties of a solid (soil or grout)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ThermalProps {
    /// Thermal conductivity \[W/(m*K)\]
    pub k: f64,
    /// Volumetric heat capacity \[J/(m^3*K)\]
    pub rho_cp: f64,
}

impl ThermalProps {
    /// Thermal diffusivity \[m^2/s\]
    pub fn diffusivity(&self) -> f64 {
        self.k / self.rho_cp
    }

    fn validate(&self, name: &str) -> anyhow::Result<()> {
        ensure!(self.k > 0.0, "{name} conductivity must be positive, found {}", self.k);
        ensure!(
            self.rho_cp > 0.0,
            "{name} volumetric heat capacity must be positive, found {}",
            self.rho_cp
        );
        Ok(())
    }
}

/// U-tube pipe properties
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PipeProps {
    /// Outer diameter \[m\]
    pub outer_diameter: f64,
    /// Wall thickness \[m\]
    pub thickness: f64,
    /// Thermal conductivity \[W/(m*K)\]
    pub k: f64,
    /// Volumetric heat capacity \[J/(m^3*K)\]
    pub rho_cp: f64,
}

impl PipeProps {
    /// Inner diameter \[m\]
    pub fn inner_diameter(&self) -> f64 {
        self.outer_diameter - 2.0 * self.thickness
    }

    pub fn outer_radius(&self) -> f64 {
        self.outer_diameter / 2.0
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.outer_diameter > 0.0, "pipe outer diameter must be positive");
        ensure!(
            self.thickness > 0.0 && self.inner_diameter() > 0.0,
            "pipe thickness {} is incompatible with outer diameter {}",
            self.thickness,
            self.outer_diameter
        );
        ensure!(self.k > 0.0, "pipe conductivity must be positive, found {}", self.k);
        Ok(())
    }
}

/// Geometry and grout/pipe properties shared by every borehole in a field
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BoreholeProps {
    /// Depth to the top of the borehole \[m\]
    pub top_depth: f64,
    /// Active borehole length \[m\]
    pub length: f64,
    /// Borehole diameter \[m\]
    pub diameter: f64,
    /// Center-to-center distance between the U-tube legs \[m\]
    pub u_tube_dist: f64,
    pub grout: ThermalProps,
    pub pipe: PipeProps,
}

impl BoreholeProps {
    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.top_depth >= 0.0, "borehole top depth must not be negative");
        ensure!(self.length > 0.0, "borehole length must be positive");
        ensure!(self.diameter > 0.0, "borehole diameter must be positive");
        ensure!(
            self.u_tube_dist > 0.0 && self.u_tube_dist + self.pipe.outer_diameter <= self.diameter,
            "U-tube spacing {} with pipe diameter {} does not fit in borehole diameter {}",
            self.u_tube_dist,
            self.pipe.outer_diameter,
            self.diameter
        );
        self.grout.validate("grout")?;
        self.pipe.validate()
    }
}

/// Plan-view arrangement of the boreholes in a field
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BoreholeLayout {
    /// `num_x` by `num_y` boreholes on a square grid
    Rectangular {
        num_x: usize,
        num_y: usize,
        /// Borehole spacing \[m\]
        spacing: f64,
    },
    /// Explicit (x, y) locations \[m\]
    Locations(Vec<(f64, f64)>),
}

impl Default for BoreholeLayout {
    fn default() -> Self {
        Self::Locations(vec![(0.0, 0.0)])
    }
}

impl BoreholeLayout {
    /// (x, y) location \[m\] of every borehole
    pub fn locations(&self) -> Vec<(f64, f64)> {
        match self {
            Self::Rectangular {
                num_x,
                num_y,
                spacing,
            } => (0..*num_x)
                .flat_map(|i| (0..*num_y).map(move |j| (i as f64 * spacing, j as f64 * spacing)))
                .collect(),
            Self::Locations(locs) => locs.clone(),
        }
    }

    pub fn num_boreholes(&self) -> usize {
        match self {
            Self::Rectangular { num_x, num_y, .. } => num_x * num_y,
            Self::Locations(locs) => locs.len(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.num_boreholes() > 0, "borehole layout is empty");
        if let Self::Rectangular { spacing, .. } = self {
            ensure!(*spacing > 0.0, "borehole spacing must be positive");
        }
        Ok(())
    }
}
