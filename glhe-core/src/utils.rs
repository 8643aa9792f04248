//! Module containing miscellaneous utility functions.

use crate::imports::*;

/// Linear interpolation over tabulated data with a binary search for the bracketing pair.
///
/// The pair used is chosen from the first index whose x exceeds `x`:
/// - below the table, the first two points
/// - above the table, the last two points
/// - otherwise, the bracketing pair
///
/// With `extrapolate == false`, queries outside the table return the end values instead.
/// `x_data` must be sorted ascending and hold at least two points.
///
/// # Arguments
///
/// * `x` - value at which to interpolate
/// * `x_data` - sorted independent variable
/// * `y_data` - dependent variable, same length as `x_data`
/// * `extrapolate` - whether to extend the end segments linearly
///
pub fn interpolate_vectors(x: &f64, x_data: &[f64], y_data: &[f64], extrapolate: bool) -> f64 {
    debug_assert!(x_data.len() == y_data.len() && x_data.len() >= 2);
    let size = x_data.len();
    if !extrapolate {
        if *x <= x_data[0] {
            return y_data[0];
        }
        if *x >= x_data[size - 1] {
            return y_data[size - 1];
        }
    }
    let upper = x_data.partition_point(|&v| v <= *x);
    let (l, u) = if upper == 0 {
        (0, 1)
    } else if upper == size {
        (size - 2, size - 1)
    } else {
        (upper - 1, upper)
    };
    let (xl, xh) = (x_data[l], x_data[u]);
    let (yl, yh) = (y_data[l], y_data[u]);
    (x - xl) / (xh - xl) * (yh - yl) + yl
}

/// [`interpolate_vectors`] for `ndarray` data
pub fn interpolate(x: &f64, x_data: &Array1<f64>, y_data: &Array1<f64>, extrapolate: bool) -> f64 {
    match (x_data.as_slice(), y_data.as_slice()) {
        (Some(xs), Some(ys)) => interpolate_vectors(x, xs, ys, extrapolate),
        _ => interpolate_vectors(x, &x_data.to_vec(), &y_data.to_vec(), extrapolate),
    }
}

/// Returns the positions `i` at which `xs[i] > xs[i + 1]`
pub fn unsorted_positions(xs: &[f64]) -> Vec<usize> {
    xs.windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] > w[1])
        .map(|(i, _)| i)
        .collect()
}

/// Composite Simpson's rule weight for point `i` of `n_points` (odd) points
pub fn simpson_weight(i: usize, n_points: usize) -> f64 {
    if i == 0 || i + 1 == n_points {
        1.0
    } else if i % 2 == 0 {
        2.0
    } else {
        4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_table() -> (Array1<f64>, Array1<f64>) {
        let xs = Array1::range(-5.0, 5.5, 1.0);
        let ys = xs.mapv(|x| 0.5 * x + 2.5);
        (xs, ys)
    }

    #[test]
    fn test_that_interpolation_works() {
        let xs = Array1::from_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let ys = Array1::from_vec(vec![0.0, 10.0, 20.0, 30.0, 40.0]);
        let y_lookup = interpolate(&0.5, &xs, &ys, false);
        assert_eq!(5.0, y_lookup);
        let y_lookup = interpolate_vectors(&0.5, &xs.to_vec(), &ys.to_vec(), false);
        assert_eq!(5.0, y_lookup);
    }

    #[test]
    fn test_interpolation_is_exact_at_table_points() {
        let (xs, ys) = linear_table();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_near!(interpolate(x, &xs, &ys, true), *y, 1e-12);
        }
    }

    #[test]
    fn test_interpolation_between_points() {
        let (xs, ys) = linear_table();
        let cases = [(-4.5, 0.25), (-0.5, 2.25), (0.25, 2.625), (4.75, 4.875)];
        for (x, expected) in cases {
            assert_near!(interpolate(&x, &xs, &ys, true), expected, 1e-12);
        }
    }

    #[test]
    fn test_extrapolation_below_and_above_table() {
        let (xs, ys) = linear_table();
        assert_near!(interpolate(&-10.0, &xs, &ys, true), -2.5, 1e-12);
        assert_near!(interpolate(&-7.5, &xs, &ys, true), -1.25, 1e-12);
        assert_near!(interpolate(&10.0, &xs, &ys, true), 7.5, 1e-12);
    }

    #[test]
    fn test_interpolate_when_lookup_is_past_end_without_extrapolate() {
        let xs = Array1::from_vec(vec![0.0, 1.0]);
        let ys = Array1::from_vec(vec![0.0, 10.0]);
        assert_eq!(interpolate(&1.01, &xs, &ys, false), 10.0);
        assert_eq!(interpolate(&-1.0, &xs, &ys, false), 0.0);
    }

    #[test]
    fn test_interpolate_with_non_evenly_spaced_x_data() {
        let xs = Array1::from_vec(vec![0.0, 10.0, 100.0, 1000.0]);
        let ys = Array1::from_vec(vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(interpolate(&55.0, &xs, &ys, false), 1.5);
    }

    #[test]
    fn test_unsorted_positions() {
        assert!(unsorted_positions(&[1.0, 1.0, 2.0]).is_empty());
        assert_eq!(unsorted_positions(&[1.0, 3.0, 2.0, 4.0, 0.0]), vec![1, 3]);
    }

    #[test]
    fn test_simpson_weights_integrate_a_parabola() {
        let n = 11;
        let dl = 1.0 / (n - 1) as f64;
        let integral: f64 = (0..n)
            .map(|i| {
                let x = i as f64 * dl;
                simpson_weight(i, n) * x * x
            })
            .sum::<f64>()
            * dl
            / 3.0;
        assert_near!(integral, 1.0 / 3.0, 1e-12);
    }
}
