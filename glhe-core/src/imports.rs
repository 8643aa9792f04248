pub use anyhow::*;
pub use log;
pub use ndarray::{array, Array1};
pub use serde::{Deserialize, Serialize};
pub use std::f64::consts::PI;
pub use std::ffi::OsStr;
pub use std::fs::File;
pub use std::path::{Path, PathBuf};

pub use crate::traits::*;
