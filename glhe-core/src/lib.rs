#![allow(clippy::field_reassign_with_default)]

//! Crate containing models for the transient thermal response of vertical ground loop heat
//! exchangers (GLHE) using g-function superposition with sub-hourly, hourly and monthly load
//! aggregation.
//! # Features:
//! - resources: embed sample borehole fields and load profiles in the crate
//! - bincode: enable binary (de)serialization via [`traits::SerdeAPI`]

#[macro_use]
pub mod macros;

pub mod aggregation;
pub mod borehole;
pub mod field;
pub mod fluid;
pub mod gfunction;
pub mod ground_temp;
pub mod history;
pub mod imports;
pub mod params;
pub mod prelude;
pub mod resistance;
pub mod resources;
pub mod response_factors;
pub mod simulation;
pub mod solver;
pub mod traits;
pub mod utils;
