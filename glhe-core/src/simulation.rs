//! Module for stepping borehole fields through prescribed inlet conditions.

use crate::field::{GlheConfig, GlheState, GroundHeatExchanger, SimClock};
use crate::imports::*;
use crate::params::{HOURS_PER_DAY, SECS_PER_HOUR};
use rayon::prelude::*;

/// Inlet conditions for one timestep
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ProfileRow {
    /// \[°C\]
    pub inlet_temp: f64,
    /// \[kg/s\]
    pub mass_flow_rate: f64,
}

fn default_timesteps_per_hour() -> u32 {
    1
}

/// Sequence of inlet conditions at a fixed number of timesteps per hour
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoadProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_timesteps_per_hour")]
    pub timesteps_per_hour: u32,
    pub rows: Vec<ProfileRow>,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            name: String::default(),
            timesteps_per_hour: default_timesteps_per_hour(),
            rows: Vec::new(),
        }
    }
}

impl SerdeAPI for LoadProfile {
    const ACCEPTED_BYTE_FORMATS: &'static [&'static str] = &["yaml", "json", "csv"];
    const ACCEPTED_STR_FORMATS: &'static [&'static str] = &["yaml", "json", "csv"];

    fn init(&mut self) -> anyhow::Result<()> {
        self.init_checks()
    }

    fn to_writer<W: std::io::Write>(&self, wtr: W, format: &str) -> anyhow::Result<()> {
        match format.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::to_writer(wtr, self)?,
            "json" => serde_json::to_writer(wtr, self)?,
            "csv" => {
                let mut wtr = csv::Writer::from_writer(wtr);
                for row in &self.rows {
                    wtr.serialize(row)?;
                }
                wtr.flush()?
            }
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_BYTE_FORMATS
            ),
        }
        Ok(())
    }

    fn to_str(&self, format: &str) -> anyhow::Result<String> {
        Ok(
            match format.trim_start_matches('.').to_lowercase().as_str() {
                "yaml" | "yml" => self.to_yaml()?,
                "json" => self.to_json()?,
                "csv" => self.to_csv()?,
                _ => bail!(
                    "Unsupported format {format:?}, must be one of {:?}",
                    Self::ACCEPTED_STR_FORMATS
                ),
            },
        )
    }

    /// CSV input carries no name and assumes one timestep per hour
    fn from_str<S: AsRef<str>>(contents: S, format: &str) -> anyhow::Result<Self> {
        Ok(
            match format.trim_start_matches('.').to_lowercase().as_str() {
                "yaml" | "yml" => Self::from_yaml(contents)?,
                "json" => Self::from_json(contents)?,
                "csv" => Self::from_reader(contents.as_ref().as_bytes(), "csv")?,
                _ => bail!(
                    "Unsupported format {format:?}, must be one of {:?}",
                    Self::ACCEPTED_STR_FORMATS
                ),
            },
        )
    }

    fn from_reader<R: std::io::Read>(rdr: R, format: &str) -> anyhow::Result<Self> {
        let mut deserialized = match format.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_reader(rdr)?,
            "json" => serde_json::from_reader(rdr)?,
            "csv" => {
                let mut profile = Self::default();
                let mut rdr = csv::Reader::from_reader(rdr);
                for result in rdr.deserialize() {
                    profile.rows.push(result?);
                }
                profile
            }
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_BYTE_FORMATS
            ),
        };
        deserialized.init()?;
        Ok(deserialized)
    }
}

impl LoadProfile {
    fn init_checks(&self) -> anyhow::Result<()> {
        ensure!(!self.rows.is_empty(), "load profile {:?} is empty", self.name);
        ensure!(
            self.timesteps_per_hour > 0,
            "load profile {:?} must have at least one timestep per hour",
            self.name
        );
        if let Some(i) = self
            .rows
            .iter()
            .position(|r| !r.inlet_temp.is_finite() || !r.mass_flow_rate.is_finite() || r.mass_flow_rate < 0.0)
        {
            bail!("load profile {:?} row {i} is invalid: {:?}", self.name, self.rows[i]);
        }
        Ok(())
    }

    /// Load profile from CSV file, parsing name from filepath
    pub fn from_csv_file<P: AsRef<Path>>(filepath: P, timesteps_per_hour: u32) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        let name = filepath
            .file_stem()
            .and_then(OsStr::to_str)
            .with_context(|| format!("Could not parse profile name from filepath: {filepath:?}"))?
            .to_string();
        let file = File::open(filepath).with_context(|| format!("Could not open {filepath:?}"))?;
        let mut profile = Self::from_reader(file, "csv")?;
        profile.name = name;
        profile.timesteps_per_hour = timesteps_per_hour;
        profile.init()?;
        Ok(profile)
    }

    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf, "csv")?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Timestep length \[hr\]
    pub fn dt(&self) -> f64 {
        1.0 / self.timesteps_per_hour as f64
    }

    /// Clock for row `i`, counting from the start of the environment
    pub fn clock_at(&self, i: usize, warmup: bool) -> SimClock {
        let tph = self.timesteps_per_hour as usize;
        let hours = i / tph;
        SimClock {
            day_of_sim: (hours / HOURS_PER_DAY as usize) as u32 + 1,
            hour_of_day: (hours % HOURS_PER_DAY as usize) as u32 + 1,
            time_step: (i % tph) as u32 + 1,
            time_step_zone: self.dt(),
            sys_time_elapsed: 0.0,
            warmup,
            begin_environment: false,
        }
    }
}

/// A field stepped through a load profile
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GlheSimulation {
    pub field: GroundHeatExchanger,
    pub profile: LoadProfile,
    /// Number of passes over the first day run as warmup before the profile
    #[serde(default)]
    pub warmup_days: usize,
    /// time step interval at which `state` is saved into `history`
    pub save_interval: Option<usize>,
    #[serde(default)]
    pub history: Vec<GlheState>,
    /// Heat extracted from the ground outside of warmup \[J\]
    #[serde(default)]
    pub total_heat: f64,
}

impl SerdeAPI for GlheSimulation {
    fn init(&mut self) -> anyhow::Result<()> {
        self.field.init()?;
        self.profile.init()
    }
}

impl GlheSimulation {
    pub fn new(field: GroundHeatExchanger, profile: LoadProfile, save_interval: Option<usize>) -> Self {
        Self {
            field,
            profile,
            warmup_days: 0,
            save_interval,
            history: Vec::new(),
            total_heat: 0.0,
        }
    }

    /// Runs the warmup passes and then every row of the profile
    pub fn walk(&mut self) -> anyhow::Result<()> {
        ensure!(!self.profile.is_empty(), format_dbg!(self.profile.is_empty()));
        if let Some(interval) = self.save_interval {
            ensure!(interval > 0, "`save_interval` must be positive");
        }
        let rows_per_day = self.profile.timesteps_per_hour as usize * HOURS_PER_DAY as usize;
        let warmup_rows = rows_per_day.min(self.profile.len());
        for day in 0..self.warmup_days {
            log::debug!("{}: warmup day {}", self.field.name(), day + 1);
            for i in 0..warmup_rows {
                self.solve_step(i, true);
            }
        }
        for i in 0..self.profile.len() {
            self.solve_step(i, false);
            self.total_heat += self.field.state.heat_transfer_rate * self.profile.dt() * SECS_PER_HOUR;
            self.save_state();
        }
        log::info!(
            "{}: simulated {} timesteps, final outlet temperature {:.3} °C",
            self.field.name(),
            self.profile.len(),
            self.field.state.outlet_temp
        );
        Ok(())
    }

    /// Solves row `i` of the profile.  The very first call begins the environment.
    pub fn solve_step(&mut self, i: usize, warmup: bool) {
        let clock = SimClock {
            begin_environment: self.field.state.i == 0,
            ..self.profile.clock_at(i, warmup)
        };
        let row = self.profile.rows[i];
        self.field.simulate(&clock, row.inlet_temp, row.mass_flow_rate);
    }

    fn save_state(&mut self) {
        if let Some(interval) = self.save_interval {
            if self.field.state.i % interval == 0 || self.history.is_empty() {
                self.history.push(self.field.state);
            }
        }
    }

    pub fn into_result(self) -> SimulationResult {
        SimulationResult {
            name: self.field.config.name.clone(),
            final_state: self.field.state,
            total_heat: self.total_heat,
            history: self.history,
        }
    }
}

/// Outcome of simulating one field
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub name: String,
    pub final_state: GlheState,
    /// Heat extracted from the ground \[J\]
    pub total_heat: f64,
    pub history: Vec<GlheState>,
}

impl SerdeAPI for SimulationResult {}

impl SimulationResult {
    /// Saved states as CSV, one row per state
    pub fn history_to_csv(&self) -> anyhow::Result<String> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(vec![]);
        wtr.write_record([
            "i",
            "time",
            "inlet_temp",
            "outlet_temp",
            "mass_flow_rate",
            "bh_temp",
            "avg_fluid_temp",
            "ground_temp",
            "heat_transfer_rate",
            "load_per_length",
            "hx_resistance",
            "regime",
        ])?;
        for s in &self.history {
            wtr.write_record(&[
                s.i.to_string(),
                s.time.to_string(),
                s.inlet_temp.to_string(),
                s.outlet_temp.to_string(),
                s.mass_flow_rate.to_string(),
                s.bh_temp.to_string(),
                s.avg_fluid_temp.to_string(),
                s.ground_temp.to_string(),
                s.heat_transfer_rate.to_string(),
                s.load_per_length.to_string(),
                s.hx_resistance.to_string(),
                s.regime.map(|r| format!("{r:?}")).unwrap_or_default(),
            ])?;
        }
        Ok(String::from_utf8(wtr.into_inner()?)?)
    }
}

/// Builds and runs a field against a profile
pub fn simulate_field(
    config: GlheConfig,
    profile: LoadProfile,
    save_interval: Option<usize>,
) -> anyhow::Result<SimulationResult> {
    let field = GroundHeatExchanger::new(config)?;
    let mut sim = GlheSimulation::new(field, profile, save_interval);
    sim.walk()
        .with_context(|| format!("simulating field {:?}", sim.field.name()))?;
    Ok(sim.into_result())
}

/// Simulates independent fields in parallel, one task per field.  Results are in the
/// order of `jobs`.
pub fn simulate_fields(
    jobs: Vec<(GlheConfig, LoadProfile)>,
    save_interval: Option<usize>,
) -> Vec<anyhow::Result<SimulationResult>> {
    jobs.into_par_iter()
        .map(|(config, profile)| simulate_field(config, profile, save_interval))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::tests::test_config;
    use crate::solver::Regime;

    fn constant_profile(rows: usize, tph: u32, inlet_temp: f64, mass_flow_rate: f64) -> LoadProfile {
        LoadProfile {
            name: "constant".into(),
            timesteps_per_hour: tph,
            rows: vec![
                ProfileRow {
                    inlet_temp,
                    mass_flow_rate,
                };
                rows
            ],
        }
    }

    #[test]
    fn test_profile_csv_roundtrip() {
        let csv = "inlet_temp,mass_flow_rate\n20.0,0.5\n21.5,0.0\n";
        let profile = LoadProfile::from_str(csv, "csv").unwrap();
        assert_eq!(profile.timesteps_per_hour, 1);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile.rows[1].inlet_temp, 21.5);
        assert_eq!(profile.to_csv().unwrap(), "inlet_temp,mass_flow_rate\n20.0,0.5\n21.5,0.0\n");
    }

    #[test]
    fn test_profile_validation() {
        assert!(LoadProfile::from_str("inlet_temp,mass_flow_rate\n", "csv").is_err());
        assert!(LoadProfile::from_str("inlet_temp,mass_flow_rate\n20.0,-1.0\n", "csv").is_err());
        let yaml = "timesteps_per_hour: 0\nrows:\n  - inlet_temp: 20.0\n    mass_flow_rate: 0.5\n";
        assert!(LoadProfile::from_str(yaml, "yaml").is_err());
    }

    #[test]
    fn test_profile_clock() {
        let profile = constant_profile(200, 4, 20.0, 0.5);
        assert_eq!(profile.clock_at(0, false).elapsed_hours(), 0.0);
        let clock = profile.clock_at(101, true);
        assert!(clock.warmup);
        assert_eq!((clock.day_of_sim, clock.hour_of_day, clock.time_step), (2, 2, 2));
        assert_near!(clock.elapsed_hours(), 25.25, 1e-12);
    }

    #[test]
    fn test_walk_saves_history_and_totals_heat() {
        let profile = constant_profile(4 * 30, 4, 25.0, 0.75);
        let result = simulate_field(test_config(), profile, Some(4)).unwrap();
        // the first state, then every fourth
        assert_eq!(result.history.len(), 1 + 30);
        assert_eq!(result.history[0].regime, Some(Regime::Startup));
        assert_eq!(result.final_state.i, 120);
        // the loop runs warmer than the ground, so heat is rejected
        assert!(result.total_heat < 0.0);
        assert!(matches!(result.final_state.regime, Some(Regime::ShortHistory)));
        let csv = result.history_to_csv().unwrap();
        assert_eq!(csv.lines().count(), 1 + result.history.len());
        assert!(csv.starts_with("i,time,inlet_temp"));
    }

    #[test]
    fn test_warmup_history_carries_into_run() {
        let profile = constant_profile(4 * 24, 4, 25.0, 0.75);
        let cold = simulate_field(test_config(), profile.clone(), None).unwrap();
        let mut sim = GlheSimulation::new(
            GroundHeatExchanger::new(test_config()).unwrap(),
            profile,
            None,
        );
        sim.warmup_days = 2;
        sim.walk().unwrap();
        let warm = sim.into_result();
        assert!(warm.history.is_empty());
        // a pre-warmed ground rejects less heat
        assert!(warm.total_heat > cold.total_heat);
        assert!(warm.final_state.bh_temp > cold.final_state.bh_temp);
    }

    #[test]
    fn test_simulate_fields_in_parallel_matches_serial() {
        let jobs: Vec<(GlheConfig, LoadProfile)> = [20.0, 25.0, 5.0]
            .iter()
            .map(|t| {
                let mut config = test_config();
                config.name = format!("inlet {t}");
                (config, constant_profile(48, 2, *t, 0.5))
            })
            .collect();
        let serial: Vec<SimulationResult> = jobs
            .iter()
            .cloned()
            .map(|(c, p)| simulate_field(c, p, Some(1)).unwrap())
            .collect();
        let parallel = simulate_fields(jobs, Some(1));
        assert_eq!(parallel.len(), 3);
        for (s, p) in serial.iter().zip(parallel) {
            assert_eq!(*s, p.unwrap());
        }
        // heat extraction when the loop runs colder than the ground
        assert!(serial[2].total_heat > 0.0);
    }

    #[test]
    fn test_bad_field_is_reported_per_job() {
        let mut bad = test_config();
        bad.design_flow = -1.0;
        let results = simulate_fields(
            vec![
                (bad, constant_profile(4, 1, 20.0, 0.5)),
                (test_config(), constant_profile(4, 1, 20.0, 0.5)),
            ],
            None,
        );
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }
}
