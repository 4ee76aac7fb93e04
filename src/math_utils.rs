/// Numerical helpers shared by the thermal engine
///
/// Interpolation, least-squares fitting and the tridiagonal solver used by the
/// implicit conduction step live here so they can be tested in isolation.

/// Assert that the deviation between two values is less than a threshold
///
/// Calculates the percentage deviation between `actual` and `expected` and
/// panics when it is not below `max_deviation`.
#[macro_export]
macro_rules! assert_deviation {
    ($actual:expr, $expected:expr, $max_deviation:expr) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, actual_val, expected_val
                );
            }
        }
    };
    ($actual:expr, $expected:expr, $max_deviation:expr, $($arg:tt)+) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%: {}\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, format_args!($($arg)+), actual_val, expected_val
                );
            }
        }
    };
}

/// Linear interpolation between two values
///
/// # Arguments
/// * `a` - Start value
/// * `b` - End value
/// * `ratio` - Interpolation ratio (0.0 = a, 1.0 = b)
///
/// # Examples
/// ```
/// use soil_thermal_rust::math_utils::lerp;
///
/// assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
/// // bare soil at -4 °C, litter at 2 °C, 25% litter cover
/// assert_eq!(lerp(-4.0, 2.0, 0.25), -2.5);
/// ```
pub fn lerp(a: f64, b: f64, ratio: f64) -> f64 {
    a + (b - a) * ratio
}

/// Arithmetic mean of a slice, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Least-squares line through `(i, y[i])` for `i = 0..y.len()`
///
/// Returns `(intercept, slope)`. A single sample yields a flat line through it,
/// an empty slice yields `(0, 0)`.
///
/// # Examples
/// ```
/// use soil_thermal_rust::math_utils::linreg;
///
/// let (a, b) = linreg(&[1.0, 3.0, 5.0, 7.0]);
/// assert!((a - 1.0).abs() < 1e-12);
/// assert!((b - 2.0).abs() < 1e-12);
/// ```
pub fn linreg(y: &[f64]) -> (f64, f64) {
    let n = y.len() as f64;
    if y.len() < 2 {
        return (y.first().copied().unwrap_or(0.0), 0.0);
    }
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for (i, &v) in y.iter().enumerate() {
        let x = i as f64;
        sx += x;
        sy += v;
        sxx += x * x;
        sxy += x * v;
    }
    let slope = (n * sxy - sx * sy) / (n * sxx - sx * sx);
    let intercept = (sy - slope * sx) / n;
    (intercept, slope)
}

/// Solve a tridiagonal system with the Thomas algorithm
///
/// `sub[0]` and `sup[n-1]` are ignored. Returns `None` when a pivot vanishes
/// or the input lengths disagree.
pub fn solve_tridiagonal(sub: &[f64], main: &[f64], sup: &[f64], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = main.len();
    if n == 0 || sub.len() != n || sup.len() != n || rhs.len() != n {
        return None;
    }
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    if main[0] == 0.0 {
        return None;
    }
    c_prime[0] = sup[0] / main[0];
    d_prime[0] = rhs[0] / main[0];
    for i in 1..n {
        let pivot = main[i] - sub[i] * c_prime[i - 1];
        if pivot == 0.0 || !pivot.is_finite() {
            return None;
        }
        c_prime[i] = sup[i] / pivot;
        d_prime[i] = (rhs[i] - sub[i] * d_prime[i - 1]) / pivot;
    }

    let mut x = d_prime;
    for i in (0..n - 1).rev() {
        x[i] -= c_prime[i] * x[i + 1];
    }
    Some(x)
}

/// Calculate the percentage deviation between two values
///
/// Uses the expected value as the reference for the percentage.
pub fn deviation(actual: f64, expected: f64) -> f64 {
    if expected.abs() < f64::EPSILON {
        if actual.abs() < f64::EPSILON {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        ((actual - expected).abs() / expected.abs()) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 1.0), 10.0);
        assert_eq!(lerp(3.5, 3.5, 0.7), 3.5);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn test_linreg_recovers_line() {
        let y: Vec<f64> = (0..31).map(|i| -2.0 + 0.3 * i as f64).collect();
        let (a, b) = linreg(&y);
        assert_abs_diff_eq!(a, -2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(b, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_linreg_degenerate() {
        assert_eq!(linreg(&[]), (0.0, 0.0));
        assert_eq!(linreg(&[4.0]), (4.0, 0.0));
    }

    #[test]
    fn test_tridiagonal_matches_dense_solution() {
        // [ 2 -1  0 ] [x0]   [1]
        // [-1  2 -1 ] [x1] = [0]
        // [ 0 -1  2 ] [x2]   [1]
        let x = solve_tridiagonal(
            &[0.0, -1.0, -1.0],
            &[2.0, 2.0, 2.0],
            &[-1.0, -1.0, 0.0],
            &[1.0, 0.0, 1.0],
        )
        .unwrap();
        for v in x {
            assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_tridiagonal_rejects_bad_input() {
        assert!(solve_tridiagonal(&[0.0], &[0.0], &[0.0], &[1.0]).is_none());
        assert!(solve_tridiagonal(&[0.0, 0.0], &[1.0], &[0.0], &[1.0]).is_none());
    }

    #[test]
    fn test_deviation() {
        assert_eq!(deviation(100.0, 100.0), 0.0);
        assert!((deviation(1530.0, 1500.0) - 2.0).abs() < 0.001);
        assert_eq!(deviation(0.0, 0.0), 0.0);
        assert_eq!(deviation(10.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn test_assert_deviation_macro() {
        assert_deviation!(105.0, 100.0, 10.0);
        assert_deviation!(1530.0, 1500.0, 5.0, "Temperature should be within 5%");
    }

    #[test]
    #[should_panic(expected = "assertion failed: deviation")]
    fn test_assert_deviation_macro_fails() {
        assert_deviation!(120.0, 100.0, 10.0);
    }
}
