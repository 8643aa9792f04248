//! Module for generating long-timestep g-functions of a borehole field with the
//! uniform heat flux finite line source method.

use crate::borehole::{BoreholeProps, ThermalProps};
use crate::gfunction::GFunctionTable;
use crate::imports::*;
use crate::params::{AggregationParams, DAYS_PER_YEAR, HOURS_PER_DAY, SECS_PER_HOUR};
use crate::utils::simpson_weight;
use itertools::iproduct;
use rayon::prelude::*;
use statrs::function::erf::erfc;

/// Log-time the grid is aligned to.  The grid starts here unless the field's shortest
/// timestep needs earlier points.
pub const LNTTS_ANCHOR: f64 = -8.5;
pub const LNTTS_STEP: f64 = 0.5;
/// Panels along the source borehole
pub const NUM_PANELS_I: usize = 50;
/// Panels along the receiving borehole
pub const NUM_PANELS_J: usize = 560;

/// Field time scale `H^2 / (9 * alpha)` \[s\]
///
/// # Arguments
///
/// * `bh_length` - borehole length \[m\]
/// * `diffusivity` - soil thermal diffusivity \[m^2/s\]
///
pub fn time_scale(bh_length: f64, diffusivity: f64) -> f64 {
    bh_length.powi(2) / (9.0 * diffusivity)
}

/// Log-time of the shortest timestep a field takes, `1 / max_ts_in_hr` hours
///
/// # Arguments
///
/// * `time_scale` - field time scale \[s\]
/// * `max_ts_in_hr` - maximum number of timesteps per hour
///
pub fn shortest_step_lntts(time_scale: f64, max_ts_in_hr: usize) -> f64 {
    (SECS_PER_HOUR / (max_ts_in_hr as f64 * time_scale)).ln()
}

/// Log-times spaced [`LNTTS_STEP`] apart on the grid through [`LNTTS_ANCHOR`].  The first
/// point is at or below both the anchor and the shortest timestep, the last point is the
/// first one at or past the end of the simulation.
pub fn lntts_points(time_scale: f64, params: &AggregationParams) -> Vec<f64> {
    let shortest = shortest_step_lntts(time_scale, params.max_ts_in_hr);
    let steps_below = ((LNTTS_ANCHOR - shortest) / LNTTS_STEP).ceil().max(0.0);
    let max_secs =
        params.max_sim_years as f64 * DAYS_PER_YEAR * HOURS_PER_DAY as f64 * SECS_PER_HOUR;
    let mut lntts = vec![LNTTS_ANCHOR - steps_below * LNTTS_STEP];
    while let Some(last) = lntts.last().copied() {
        if last.exp() * time_scale >= max_secs {
            break;
        }
        lntts.push(last + LNTTS_STEP);
    }
    lntts
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: f64,
    y: f64,
    z: f64,
}

/// Evenly spaced points along one borehole for Simpson integration
#[derive(Debug, Clone)]
struct Segments {
    dl: f64,
    points: Vec<Point>,
}

impl Segments {
    fn new(x: f64, y: f64, top_depth: f64, length: f64, num_panels: usize) -> Self {
        let dl = length / num_panels as f64;
        Self {
            dl,
            points: (0..=num_panels)
                .map(|i| Point {
                    x,
                    y,
                    z: top_depth + i as f64 * dl,
                })
                .collect(),
        }
    }

    /// Simpson sum of `f` over the points
    fn integrate(&self, f: impl Fn(&Point) -> f64) -> f64 {
        let n = self.points.len();
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| simpson_weight(i, n) * f(p))
            .sum::<f64>()
            * self.dl
            / 3.0
    }
}

/// Integration points of one borehole
#[derive(Debug, Clone)]
struct BoreholePoints {
    /// Source points used against other boreholes
    source: Segments,
    /// Source points shifted one radius off the axis, used against itself
    source_self: Segments,
    receiver: Segments,
}

impl BoreholePoints {
    fn new((x, y): (f64, f64), bh: &BoreholeProps) -> Self {
        let shift = bh.radius() / 2f64.sqrt();
        Self {
            source: Segments::new(x, y, bh.top_depth, bh.length, NUM_PANELS_I),
            source_self: Segments::new(x + shift, y - shift, bh.top_depth, bh.length, NUM_PANELS_I),
            receiver: Segments::new(x, y, bh.top_depth, bh.length, NUM_PANELS_J),
        }
    }
}

/// Point source response between `p_i` and `p_j` less that of the image of `p_j`
/// mirrored about the ground surface
fn point_response(p_i: &Point, p_j: &Point, diffusivity: f64, time: f64) -> f64 {
    let horiz = (p_i.x - p_j.x).powi(2) + (p_i.y - p_j.y).powi(2);
    let dist = (horiz + (p_i.z - p_j.z).powi(2)).sqrt();
    let mirror = (horiz + (p_i.z + p_j.z).powi(2)).sqrt();
    let denom = 2.0 * (diffusivity * time).sqrt();
    erfc(dist / denom) / dist - erfc(mirror / denom) / mirror
}

fn pair_response(
    bh_i: &BoreholePoints,
    bh_j: &BoreholePoints,
    same: bool,
    diffusivity: f64,
    time: f64,
) -> f64 {
    let source = if same { &bh_i.source_self } else { &bh_i.source };
    source.integrate(|p_i| {
        bh_j.receiver
            .integrate(|p_j| point_response(p_i, p_j, diffusivity, time))
    })
}

/// Generates the uniform heat flux g-function of a field of identical boreholes
///
/// # Arguments
///
/// * `locations` - (x, y) location \[m\] of each borehole
/// * `borehole` - geometry shared by every borehole
/// * `soil` - soil thermal properties
/// * `params` - aggregation parameters, giving the shortest timestep and the simulated
///   years the table must cover
///
pub fn uniform_heat_flux_gfunctions(
    locations: &[(f64, f64)],
    borehole: &BoreholeProps,
    soil: &ThermalProps,
    params: &AggregationParams,
) -> anyhow::Result<GFunctionTable> {
    ensure!(!locations.is_empty(), "cannot generate g-functions without boreholes");
    borehole.validate()?;
    let diffusivity = soil.diffusivity();
    let ts = time_scale(borehole.length, diffusivity);
    let lntts = lntts_points(ts, params);
    let total_length = locations.len() as f64 * borehole.length;
    let boreholes: Vec<BoreholePoints> = locations
        .iter()
        .map(|loc| BoreholePoints::new(*loc, borehole))
        .collect();
    log::info!(
        "Generating g-functions for {} boreholes at {} log-times",
        boreholes.len(),
        lntts.len()
    );

    let gfnc: Vec<f64> = lntts
        .par_iter()
        .map(|l| {
            let time = l.exp() * ts;
            iproduct!(boreholes.iter().enumerate(), boreholes.iter().enumerate())
                .map(|((i, bh_i), (j, bh_j))| pair_response(bh_i, bh_j, i == j, diffusivity, time))
                .sum::<f64>()
                / (2.0 * total_length)
        })
        .collect();

    GFunctionTable::new(lntts, gfnc, borehole.radius() / borehole.length)
        .with_context(|| format_dbg!())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::borehole::tests::test_borehole;

    const SQUARE: [(f64, f64); 4] = [(0.0, 0.0), (5.0, 0.0), (0.0, 5.0), (5.0, 5.0)];

    fn soil() -> ThermalProps {
        ThermalProps {
            k: 2.423,
            rho_cp: 2.343e6,
        }
    }

    #[test]
    fn test_time_scale_and_lntts_points() {
        let ts = time_scale(100.0, soil().diffusivity());
        assert_near!(ts, 1.0744256e9, 1e3);
        // one minute steps reach down to ln(t/ts) = -16.70
        assert_near!(shortest_step_lntts(ts, 60), -16.7007, 1e-4);
        let lntts = lntts_points(ts, &AggregationParams::default());
        assert_eq!(lntts.len(), 28);
        assert_eq!(lntts[0], -17.0);
        assert_eq!(lntts[17], LNTTS_ANCHOR);
        assert_near!(*lntts.last().unwrap(), -3.5, 1e-12);
        assert!(lntts.windows(2).all(|w| (w[1] - w[0] - LNTTS_STEP).abs() < 1e-12));
    }

    #[test]
    fn test_lntts_points_never_start_after_anchor() {
        let ts = time_scale(100.0, soil().diffusivity());
        let params = AggregationParams {
            max_ts_in_hr: 1,
            ..Default::default()
        };
        // hourly steps sit at -12.6, still below the anchor
        let lntts = lntts_points(ts, &params);
        assert_eq!(lntts[0], -13.0);
        // a time scale short enough that the shortest step is past the anchor
        let lntts = lntts_points(10.0, &params);
        assert_eq!(lntts[0], LNTTS_ANCHOR);
    }

    #[test]
    fn test_four_borehole_square_field() {
        let table = uniform_heat_flux_gfunctions(
            &SQUARE,
            &test_borehole(),
            &soil(),
            &AggregationParams::default(),
        )
        .unwrap();
        assert_eq!(table.len(), 28);
        assert_near!(table.g_ref_ratio, 0.109982 / 2.0 / 100.0, 1e-12);
        for (lntts, expected) in [
            (-14.0, 0.14595),
            (-11.0, 1.3204),
            (-8.5, 2.5437),
            (-6.5, 3.5378),
            (-4.5, 5.1372),
            (-3.5, 6.5307),
        ] {
            assert_near!(table.interp(lntts), expected, 1e-3);
        }
        assert!(table.gfnc.windows(2).all(|w| w[1] > w[0]));
        assert!(table.gfnc[0] > 0.0);
    }

    #[test]
    fn test_single_borehole_is_below_field() {
        let bh = test_borehole();
        let params = AggregationParams::default();
        let single = uniform_heat_flux_gfunctions(&[(0.0, 0.0)], &bh, &soil(), &params).unwrap();
        let field = uniform_heat_flux_gfunctions(&SQUARE, &bh, &soil(), &params).unwrap();
        // neighbors only add interference
        for (s, f) in single.gfnc.iter().zip(&field.gfnc) {
            assert!(s <= f);
        }
    }

    #[test]
    fn test_empty_field_is_rejected() {
        let params = AggregationParams::default();
        assert!(uniform_heat_flux_gfunctions(&[], &test_borehole(), &soil(), &params).is_err());
    }
}
