use glhe_core::assert_near;
use glhe_core::prelude::*;

fn hourly_profile(hours: usize, inlet_temp: f64, mass_flow_rate: f64) -> LoadProfile {
    LoadProfile {
        name: "hourly".into(),
        timesteps_per_hour: 1,
        rows: vec![
            ProfileRow {
                inlet_temp,
                mass_flow_rate,
            };
            hours
        ],
    }
}

#[test]
fn test_config_and_profile_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let config = GlheConfig::from_resource("fields/four_borehole_square.yaml").unwrap();
    for ext in ["yaml", "json"] {
        let path = dir.path().join(format!("field.{ext}"));
        config.to_file(&path).unwrap();
        let back = GlheConfig::from_file(&path).unwrap();
        assert_eq!(back.name, config.name);
        assert_eq!(back.layout, config.layout);
        assert_eq!(back.gfunction.unwrap().len(), 28);
    }

    let profile = LoadProfile::from_resource("profiles/cooling_day.csv").unwrap();
    let path = dir.path().join("cooling_day.csv");
    profile.to_file(&path).unwrap();
    let back = LoadProfile::from_csv_file(&path, 1).unwrap();
    assert_eq!(back.name, "cooling_day");
    assert_eq!(back.rows, profile.rows);
}

#[test]
fn test_unsupported_format_is_rejected() {
    let profile = hourly_profile(3, 20.0, 0.5);
    assert!(profile.to_str("toml").is_err());
    assert!(GlheConfig::from_str("", "xml").is_err());
}

#[test]
fn test_heating_week_extracts_heat() {
    let config = GlheConfig::from_resource("fields/four_borehole_square.yaml").unwrap();
    let mut profile = LoadProfile::from_resource("profiles/heating_week_15min.csv").unwrap();
    profile.timesteps_per_hour = 4;
    let result = simulate_field(config, profile, Some(4)).unwrap();

    assert!(result.total_heat > 0.0);
    // ground is cooled by the extraction
    let s = result.final_state;
    assert!(s.bh_temp < s.ground_temp);
    for state in result.history.iter().filter(|s| s.time > 0.0) {
        assert!(state.outlet_temp.is_finite());
        if state.mass_flow_rate > 0.0 {
            let cp = Fluid::Water.specific_heat(state.inlet_temp);
            assert_near!(
                state.heat_transfer_rate,
                state.mass_flow_rate * cp * (state.outlet_temp - state.inlet_temp),
                1e-6
            );
        } else {
            assert_eq!(state.heat_transfer_rate, 0.0);
            assert_eq!(state.outlet_temp, state.inlet_temp);
        }
    }
}

#[test]
fn test_quarter_hour_rejection_warms_the_borehole() {
    let config = GlheConfig::from_resource("fields/four_borehole_square.yaml").unwrap();
    let profile = LoadProfile {
        name: "rejection".into(),
        timesteps_per_hour: 4,
        rows: vec![
            ProfileRow {
                inlet_temp: 30.0,
                mass_flow_rate: 0.5,
            };
            4 * 48
        ],
    };
    let result = simulate_field(config, profile, Some(1)).unwrap();
    let solved = &result.history[1..];
    for s in solved {
        assert!(s.bh_temp >= s.ground_temp, "t = {} h: {} < {}", s.time, s.bh_temp, s.ground_temp);
    }
    assert!(solved.last().unwrap().bh_temp > solved[1].bh_temp);
}

#[test]
fn test_long_history_run_stays_consistent() {
    let config = GlheConfig::from_resource("fields/four_borehole_square.yaml").unwrap();
    let result = simulate_field(config, hourly_profile(1000, 25.0, 0.75), Some(1)).unwrap();
    let history = &result.history;
    assert_eq!(history.len(), 1000);
    assert_eq!(history[0].regime, Some(Regime::Startup));
    assert_eq!(history[500].regime, Some(Regime::ShortHistory));
    assert_eq!(
        history[999].regime,
        Some(Regime::LongHistory { current_month: 1 })
    );

    let cp = Fluid::Water.specific_heat(25.0);
    // no history exists yet at the first solved step
    assert_eq!(history[1].bh_temp, history[1].ground_temp);
    for s in &history[2..] {
        assert!(s.ground_temp < s.bh_temp);
        assert!(s.bh_temp < s.avg_fluid_temp);
        assert!(s.avg_fluid_temp < s.inlet_temp);
        assert_near!(s.heat_transfer_rate, 0.75 * cp * (s.outlet_temp - s.inlet_temp), 1e-6);
    }
    // switching to monthly superposition does not jump the outlet temperature
    let boundary = history
        .iter()
        .position(|s| matches!(s.regime, Some(Regime::LongHistory { .. })))
        .unwrap();
    assert_eq!(history[boundary].time, 937.0);
    let jump = history[boundary].outlet_temp - history[boundary - 1].outlet_temp;
    assert!(jump.abs() < 1.0, "outlet jumped by {jump} K");
    // the ground keeps warming under constant rejection
    assert!(history[999].bh_temp > history[100].bh_temp);
}

#[test]
fn test_generated_gfunctions_drive_a_field() {
    let config = GlheConfig::from_resource("fields/single_borehole_kusuda.yaml").unwrap();
    let field = GroundHeatExchanger::new(config).unwrap();
    assert!(field.gfunction.len() > 2);
    assert!(field.gfunction.gfnc.windows(2).all(|w| w[1] > w[0]));
    assert_near!(field.gfunction.g_ref_ratio, 0.057 / 80.0, 1e-12);

    let profile = LoadProfile::from_resource("profiles/cooling_day.csv").unwrap();
    let mut sim = GlheSimulation::new(field, profile, Some(1));
    sim.warmup_days = 1;
    sim.walk().unwrap();
    let result = sim.into_result();
    assert_eq!(result.history.len(), 24);
    // cooling rejects heat during occupied hours
    assert!(result.total_heat < 0.0);
}

#[test]
fn test_fields_run_independently_in_parallel() {
    let square = GlheConfig::from_resource("fields/four_borehole_square.yaml").unwrap();
    let mut hot = square.clone();
    hot.name = "hot".into();
    let jobs = vec![
        (square, hourly_profile(48, 8.0, 0.5)),
        (hot, hourly_profile(48, 30.0, 0.5)),
    ];
    let results: Vec<SimulationResult> = simulate_fields(jobs, None)
        .into_iter()
        .collect::<anyhow::Result<_>>()
        .unwrap();
    assert_eq!(results[0].name, "four borehole square");
    assert!(results[0].total_heat > 0.0);
    assert_eq!(results[1].name, "hot");
    assert!(results[1].total_heat < 0.0);
}
