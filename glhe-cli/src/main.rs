use std::str::FromStr;

use clap::{ArgGroup, Parser};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

extern crate glhe_core;
use glhe_core::prelude::*;

/// Simulates a vertical ground loop heat exchanger field through a load profile.
/// After running `cargo build --release`, run with
/// ```bash
/// ./target/release/glhe-cli --config-file glhe-core/resources/fields/four_borehole_square.yaml --profile-file glhe-core/resources/profiles/heating_week_15min.csv --timesteps-per-hour 4
/// ```
/// Set `RUST_LOG=info` to see progress.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(group(
    ArgGroup::new("field")
    .required(true)
    .args(&["config", "config-file"])
))]
#[clap(group(
    ArgGroup::new("load")
    .required(true)
    .args(&["profile", "profile-file"])
))]
struct GlheApi {
    /// Field configuration as json string
    #[clap(long, value_parser)]
    config: Option<String>,
    #[clap(long, value_parser)]
    /// Path to field configuration file (yaml or json)
    config_file: Option<String>,
    /// Load profile as json string
    #[clap(long, value_parser)]
    profile: Option<String>,
    #[clap(long, value_parser)]
    /// Path to load profile file (csv, yaml or json)
    profile_file: Option<String>,
    #[clap(long, value_parser)]
    /// Timesteps per hour, overriding the profile's own value
    timesteps_per_hour: Option<u32>,
    #[clap(long, value_parser, default_value_t = 0)]
    /// Passes over the first day run as warmup before the profile
    warmup_days: usize,
    #[clap(long, value_parser)]
    /// Save every nth state into the history (default 1)
    save_interval: Option<usize>,
    #[clap(long, value_parser)]
    /// How to return results: `summary` (default), `json` or `csv`
    res_fmt: Option<String>,
}

/// Result output selected with `--res-fmt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResFmt {
    Summary,
    Json,
    Csv,
}

impl FromStr for ResFmt {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "summary" => Ok(Self::Summary),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => anyhow::bail!(
                "Invalid option `{other}` for `--res-fmt`, must be one of `summary`, `json` or `csv`"
            ),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct Summary {
    name: String,
    timesteps: usize,
    final_outlet_temp: f64,
    final_bh_temp: f64,
    /// \[kWh\]
    total_heat_kwh: f64,
}

impl Summary {
    fn new(result: &SimulationResult, timesteps: usize) -> Self {
        Self {
            name: result.name.clone(),
            timesteps,
            final_outlet_temp: result.final_state.outlet_temp,
            final_bh_temp: result.final_state.bh_temp,
            total_heat_kwh: result.total_heat / 3.6e6,
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(api: &GlheApi) -> anyhow::Result<GlheConfig> {
    match (&api.config, &api.config_file) {
        (Some(json), _) => GlheConfig::from_json(json),
        (None, Some(path)) => GlheConfig::from_file(path),
        (None, None) => anyhow::bail!("one of `--config` or `--config-file` is required"),
    }
}

fn load_profile(api: &GlheApi) -> anyhow::Result<LoadProfile> {
    let mut profile = match (&api.profile, &api.profile_file) {
        (Some(json), _) => LoadProfile::from_json(json)?,
        (None, Some(path)) if path.to_lowercase().ends_with(".csv") => {
            LoadProfile::from_csv_file(path, api.timesteps_per_hour.unwrap_or(1))?
        }
        (None, Some(path)) => LoadProfile::from_file(path)?,
        (None, None) => anyhow::bail!("one of `--profile` or `--profile-file` is required"),
    };
    if let Some(tph) = api.timesteps_per_hour {
        profile.timesteps_per_hour = tph;
        profile.init()?;
    }
    Ok(profile)
}

pub fn main() -> anyhow::Result<()> {
    init_logging();
    let api = GlheApi::parse();
    let res_fmt = api
        .res_fmt
        .as_deref()
        .map_or(Ok(ResFmt::Summary), ResFmt::from_str)?;
    let config = load_config(&api)?;
    let profile = load_profile(&api)?;
    let timesteps = profile.len();
    log::info!("simulating {timesteps} timesteps of profile {:?}", profile.name);

    let field = GroundHeatExchanger::new(config)?;
    let mut sim = GlheSimulation::new(field, profile, Some(api.save_interval.unwrap_or(1)));
    sim.warmup_days = api.warmup_days;
    sim.walk()?;
    let result = sim.into_result();

    match res_fmt {
        ResFmt::Summary => {
            let summary = Summary::new(&result, timesteps);
            println!("Field: {}", summary.name);
            println!("Timesteps: {}", summary.timesteps);
            println!("Final outlet temperature [C]: {:.3}", summary.final_outlet_temp);
            println!("Final borehole temperature [C]: {:.3}", summary.final_bh_temp);
            println!("Heat extracted from ground [kWh]: {:.3}", summary.total_heat_kwh);
        }
        ResFmt::Json => println!("{}", result.to_json()?),
        ResFmt::Csv => print!("{}", result.history_to_csv()?),
    }
    Ok(())
}
