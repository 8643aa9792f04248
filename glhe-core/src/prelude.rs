//! Convenience re-exports of the types needed to configure and run a field.

pub use crate::borehole::{BoreholeLayout, BoreholeProps, PipeProps, ThermalProps};
pub use crate::field::{GlheConfig, GlheState, GroundHeatExchanger, OutletNode, SimClock};
pub use crate::fluid::{Fluid, FluidProperties, FluidState};
pub use crate::gfunction::GFunctionTable;
pub use crate::ground_temp::{GroundTempModel, KusudaAchenbach};
pub use crate::params::AggregationParams;
pub use crate::simulation::{
    simulate_field, simulate_fields, GlheSimulation, LoadProfile, ProfileRow, SimulationResult,
};
pub use crate::solver::Regime;
pub use crate::traits::SerdeAPI;
