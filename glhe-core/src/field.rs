//! Module containing the field driver, which owns a borehole field's configuration,
//! simulation-time bookkeeping and load history, and orchestrates aggregation and the
//! superposition solve each timestep.

use crate::borehole::{BoreholeLayout, BoreholeProps, ThermalProps};
use crate::fluid::{Fluid, FluidProperties};
use crate::gfunction::GFunctionTable;
use crate::ground_temp::GroundTempModel;
use crate::history::LoadHistory;
use crate::imports::*;
use crate::params::*;
use crate::resistance::ResistanceModel;
use crate::response_factors::{shortest_step_lntts, time_scale, uniform_heat_flux_gfunctions};
use crate::solver::{solve, FlowState, Regime, ResponseFunction, SolverInputs};

/// Calendar position of the current call
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    /// Day of the current environment, counted from 1
    pub day_of_sim: u32,
    /// Hour of the day, counted from 1
    pub hour_of_day: u32,
    /// Zone timestep within the hour, counted from 1
    pub time_step: u32,
    /// Zone timestep length \[hr\]
    pub time_step_zone: f64,
    /// System time elapsed within the zone timestep \[hr\]
    pub sys_time_elapsed: f64,
    pub warmup: bool,
    /// True while the first call(s) of a new environment are made
    pub begin_environment: bool,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            day_of_sim: 1,
            hour_of_day: 1,
            time_step: 1,
            time_step_zone: 1.0,
            sys_time_elapsed: 0.0,
            warmup: false,
            begin_environment: false,
        }
    }
}

impl SimClock {
    /// Hours elapsed since the start of the environment
    pub fn elapsed_hours(&self) -> f64 {
        (self.day_of_sim as f64 - 1.0) * HOURS_PER_DAY as f64 + self.hour_of_day as f64 - 1.0
            + (self.time_step as f64 - 1.0) * self.time_step_zone
            + self.sys_time_elapsed
    }
}

fn default_max_warnings() -> usize {
    DEFAULT_MAX_WARNINGS
}

/// Everything needed to set up a borehole field
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GlheConfig {
    #[serde(default)]
    pub name: String,
    pub layout: BoreholeLayout,
    pub borehole: BoreholeProps,
    pub soil: ThermalProps,
    #[serde(default)]
    pub fluid: Fluid,
    #[serde(default)]
    pub ground_temp: GroundTempModel,
    /// Design volume flow rate \[m^3/s\]
    pub design_flow: f64,
    /// Precomputed g-function table, generated from the layout when absent
    #[serde(default)]
    pub gfunction: Option<GFunctionTable>,
    #[serde(default)]
    pub aggregation: AggregationParams,
    /// Number of times the delta T diagnostic is emitted
    #[serde(default = "default_max_warnings")]
    pub max_warnings: usize,
}

impl SerdeAPI for GlheConfig {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()
    }
}

impl GlheConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.layout
            .validate()
            .with_context(|| format!("field {:?}", self.name))?;
        self.borehole
            .validate()
            .with_context(|| format!("field {:?}", self.name))?;
        ensure!(
            self.soil.k > 0.0 && self.soil.rho_cp > 0.0,
            "field {:?}: soil properties must be positive: {:?}",
            self.name,
            self.soil
        );
        ensure!(
            self.design_flow > 0.0,
            "field {:?}: design flow must be positive, found {}",
            self.name,
            self.design_flow
        );
        self.fluid.validate()?;
        self.ground_temp.validate()?;
        self.aggregation.validate()?;
        if let Some(table) = &self.gfunction {
            table
                .validate()
                .with_context(|| format!("field {:?} g-functions", self.name))?;
        }
        Ok(())
    }
}

/// Fluid leaving the field
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct OutletNode {
    /// \[°C\]
    pub temp: f64,
    /// Enthalpy relative to 0 °C \[J/kg\]
    pub enthalpy: f64,
    /// \[kg/s\]
    pub mass_flow_rate: f64,
}

/// Field outputs for the current timestep
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct GlheState {
    /// Number of calls since construction
    pub i: usize,
    /// Elapsed simulation time \[hr\]
    pub time: f64,
    /// \[°C\]
    pub inlet_temp: f64,
    /// \[°C\]
    pub outlet_temp: f64,
    /// \[kg/s\]
    pub mass_flow_rate: f64,
    /// Average borehole wall temperature \[°C\]
    pub bh_temp: f64,
    /// Average fluid temperature \[°C\]
    pub avg_fluid_temp: f64,
    /// Undisturbed ground temperature \[°C\]
    pub ground_temp: f64,
    /// Heat extracted from the ground \[W\]
    pub heat_transfer_rate: f64,
    /// Heat extracted from the ground per unit borehole length \[W/m\]
    pub load_per_length: f64,
    /// Effective borehole resistance \[m*K/W\]
    pub hx_resistance: f64,
    pub regime: Option<Regime>,
}

/// A borehole field coupled to a hydronic loop
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroundHeatExchanger {
    pub config: GlheConfig,
    pub gfunction: GFunctionTable,
    /// Field time scale \[hr\]
    pub time_scale: f64,
    /// `2 * pi * k_soil` \[W/(m*K)\]
    pub k_ground_factor: f64,
    /// Total borehole length \[m\]
    pub total_tube_length: f64,
    pub resistance: ResistanceModel,
    pub history: LoadHistory,
    pub state: GlheState,
    pub outlet_node: OutletNode,
    /// \[kg/s\]
    pub design_mass_flow: f64,
    pub num_warnings: usize,
    env_flag: bool,
    trigger_design_day_reset: bool,
    update_cur_sim_time: bool,
}

impl SerdeAPI for GroundHeatExchanger {
    fn init(&mut self) -> anyhow::Result<()> {
        self.config.validate()?;
        self.gfunction.validate()
    }
}

impl TryFrom<GlheConfig> for GroundHeatExchanger {
    type Error = anyhow::Error;

    fn try_from(config: GlheConfig) -> anyhow::Result<Self> {
        Self::new(config)
    }
}

impl GroundHeatExchanger {
    /// Sets up a field, generating its g-functions if the configuration has none
    pub fn new(config: GlheConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let num_boreholes = config.layout.num_boreholes();
        let gfunction = match &config.gfunction {
            Some(table) => table.clone(),
            None => uniform_heat_flux_gfunctions(
                &config.layout.locations(),
                &config.borehole,
                &config.soil,
                &config.aggregation,
            )
            .with_context(|| format!("field {:?}", config.name))?,
        };
        let ts = time_scale(config.borehole.length, config.soil.diffusivity());
        let shortest = shortest_step_lntts(ts, config.aggregation.max_ts_in_hr);
        if !gfunction.covers(shortest) {
            log::warn!(
                "g-function table of field {:?} starts above ln(t/ts) = {:.3} of its shortest timestep, extrapolating g = {:.4} there",
                config.name,
                shortest,
                gfunction.interp(shortest)
            );
        }
        let tg = config.ground_temp.borehole_average(
            config.borehole.top_depth,
            config.borehole.length,
            0.0,
        );
        Ok(Self {
            gfunction,
            time_scale: ts / SECS_PER_HOUR,
            k_ground_factor: 2.0 * PI * config.soil.k,
            total_tube_length: num_boreholes as f64 * config.borehole.length,
            resistance: ResistanceModel::new(config.borehole, &config.soil, num_boreholes),
            history: LoadHistory::new(config.aggregation),
            state: GlheState {
                inlet_temp: tg,
                outlet_temp: tg,
                bh_temp: tg,
                avg_fluid_temp: tg,
                ground_temp: tg,
                ..Default::default()
            },
            outlet_node: OutletNode {
                temp: tg,
                ..Default::default()
            },
            design_mass_flow: config.design_flow
                * config.fluid.density(DESIGN_DENSITY_TEMP_DEGC),
            num_warnings: 0,
            env_flag: true,
            trigger_design_day_reset: false,
            update_cur_sim_time: false,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn response(&self) -> ResponseFunction {
        ResponseFunction {
            table: &self.gfunction,
            time_scale: self.time_scale,
            bh_radius: self.config.borehole.radius(),
            bh_length: self.config.borehole.length,
            k_ground_factor: self.k_ground_factor,
        }
    }

    /// Clears the history and outputs at the start of a new environment
    pub fn init_environment(&mut self) {
        self.env_flag = false;
        self.design_mass_flow =
            self.config.design_flow * self.config.fluid.density(DESIGN_DENSITY_TEMP_DEGC);
        self.history.reset_environment();
        let tg = self.state.ground_temp;
        self.state.inlet_temp = tg;
        self.state.outlet_temp = tg;
        self.state.heat_transfer_rate = 0.0;
        self.state.load_per_length = 0.0;
        self.outlet_node = OutletNode {
            temp: tg,
            enthalpy: 0.0,
            mass_flow_rate: 0.0,
        };
        log::debug!("{}: environment initialized at {tg:.3} °C", self.config.name);
    }

    /// Per-call initialization: starts a new environment when needed and evaluates the
    /// undisturbed ground temperature over the borehole depth
    pub fn init_sim_vars(&mut self, clock: &SimClock) {
        let time_s = clock.elapsed_hours() * SECS_PER_HOUR;
        self.state.ground_temp = self.config.ground_temp.borehole_average(
            self.config.borehole.top_depth,
            self.config.borehole.length,
            time_s,
        );
        if self.env_flag && clock.begin_environment {
            self.init_environment();
        }
        if !clock.begin_environment {
            self.env_flag = true;
        }
    }

    /// Advances the field one call: updates the history from the previous solved load
    /// and solves for the new load and outlet temperature.  Calls at or before the
    /// start of the environment leave the outputs untouched.
    ///
    /// # Arguments
    ///
    /// * `clock` - calendar position of this call
    /// * `inlet_temp` - fluid temperature entering the field \[°C\]
    /// * `mass_flow_rate` - total field mass flow rate \[kg/s\]
    ///
    pub fn calc(&mut self, clock: &SimClock, inlet_temp: f64, mass_flow_rate: f64) {
        self.state.i += 1;
        self.state.inlet_temp = inlet_temp;
        self.state.mass_flow_rate = mass_flow_rate;

        if self.trigger_design_day_reset && clock.warmup {
            self.update_cur_sim_time = true;
        }
        if clock.day_of_sim == 1 && self.update_cur_sim_time {
            self.history.reset_design_day();
            self.update_cur_sim_time = false;
            self.trigger_design_day_reset = false;
        }

        let t = clock.elapsed_hours();
        self.history.set_time(t);
        self.state.time = t;

        if clock.day_of_sim > 1 {
            self.update_cur_sim_time = true;
        }
        if !clock.warmup {
            self.trigger_design_day_reset = true;
        }

        if t <= 0.0 {
            self.history.prev_time_steps.fill(0.0);
            self.history.aggregate();
            self.state.regime = Some(Regime::Startup);
            return;
        }

        self.history.record_time_step();
        self.history.aggregate();

        let fluid = self.config.fluid.state_at(inlet_temp);
        self.state.hx_resistance = self.resistance.hx_resistance(mass_flow_rate, &fluid);

        let regime = Regime::select(&self.history);
        let inputs = SolverInputs {
            ground_temp: self.state.ground_temp,
            inlet_temp,
            flow: FlowState::new(mass_flow_rate, fluid.specific_heat),
            hx_resistance: self.state.hx_resistance,
            total_tube_length: self.total_tube_length,
        };
        let Some(solution) = solve(&self.history, regime, &self.response(), &inputs) else {
            return;
        };

        self.state.regime = Some(solution.regime);
        self.state.bh_temp = self.state.ground_temp - solution.history_sum;
        self.history.last_qn_sub_hr = solution.load;
        self.state.load_per_length = solution.load;
        self.state.outlet_temp = solution.outlet_temp;
        self.state.heat_transfer_rate = solution.load * self.total_tube_length;
        self.state.avg_fluid_temp = solution.fluid_avg_temp;
    }

    /// Writes the outlet conditions and checks the temperature change across the
    /// field for plausibility
    pub fn update_outlet_node(&mut self, clock: &SimClock) -> OutletNode {
        let temp = self.state.outlet_temp;
        self.outlet_node = OutletNode {
            temp,
            enthalpy: temp * self.config.fluid.specific_heat(temp),
            mass_flow_rate: self.state.mass_flow_rate,
        };

        let delta_t = (temp - self.state.inlet_temp).abs();
        if delta_t > DELTA_T_WARNING_LIMIT
            && self.num_warnings < self.config.max_warnings
            && !clock.warmup
        {
            self.design_mass_flow =
                self.config.design_flow * self.config.fluid.density(self.state.inlet_temp);
            log::warn!(
                "Check GLHE design inputs & g-functions for consistency\n\
                 For ground heat exchanger {:?}: delta T {:.1} K > {} K.\n\
                 This can happen when the mass flow rate is much lower than the design value or changes rapidly.\n\
                 Current flow rate = {:.3} kg/s; design flow rate = {:.3} kg/s",
                self.config.name,
                delta_t,
                DELTA_T_WARNING_LIMIT,
                self.state.mass_flow_rate,
                self.design_mass_flow
            );
            self.num_warnings += 1;
        }
        self.outlet_node
    }

    /// One full call from the loop: initialization, solve and outlet update
    pub fn simulate(&mut self, clock: &SimClock, inlet_temp: f64, mass_flow_rate: f64) -> OutletNode {
        self.init_sim_vars(clock);
        self.calc(clock, inlet_temp, mass_flow_rate);
        self.update_outlet_node(clock)
    }

    /// Named report samples `(name, units, value, aggregation)` for the current timestep
    pub fn report_variables(&self) -> Vec<(&'static str, &'static str, f64, &'static str)> {
        let s = &self.state;
        vec![
            ("Ground Heat Exchanger Average Borehole Temperature", "C", s.bh_temp, "Average"),
            ("Ground Heat Exchanger Heat Transfer Rate", "W", s.heat_transfer_rate, "Average"),
            ("Ground Heat Exchanger Inlet Temperature", "C", s.inlet_temp, "Average"),
            ("Ground Heat Exchanger Outlet Temperature", "C", s.outlet_temp, "Average"),
            ("Ground Heat Exchanger Mass Flow Rate", "kg/s", s.mass_flow_rate, "Average"),
            ("Ground Heat Exchanger Average Fluid Temperature", "C", s.avg_fluid_temp, "Average"),
            ("Ground Heat Exchanger Farfield Ground Temperature", "C", s.ground_temp, "Average"),
        ]
    }
}
