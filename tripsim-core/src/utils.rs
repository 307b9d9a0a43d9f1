//! Module containing miscellaneous utility functions.

use crate::imports::*;

/// Linear interpolation of `x` over `(x_data, y_data)`, holding the end
/// values for `x` outside the data range.  `x_data` must be non-decreasing;
/// repeated abscissas resolve to the first of the run.
pub fn interp_saturating(x: f64, x_data: &[f64], y_data: &[f64]) -> f64 {
    let n = x_data.len().min(y_data.len());
    if n == 0 {
        return 0.0;
    }
    if n == 1 || x <= x_data[0] {
        return y_data[0];
    }
    if x >= x_data[n - 1] {
        return y_data[n - 1];
    }
    let hi = x_data[..n].partition_point(|&xd| xd < x).max(1);
    let lo = hi - 1;
    let dx = x_data[hi] - x_data[lo];
    if dx <= 0.0 {
        return y_data[hi];
    }
    y_data[lo] + (x - x_data[lo]) / dx * (y_data[hi] - y_data[lo])
}

/// return max <f64> of arr
pub fn arrmax(arr: &[f64]) -> f64 {
    arr.iter().copied().fold(f64::NAN, f64::max)
}

/// true if `arr` is non-decreasing
pub fn is_sorted(arr: &[f64]) -> bool {
    arr.iter().tuple_windows().all(|(a, b)| a <= b)
}

/// return cumsum <f64> of arr
pub fn ndarrcumsum(arr: &Array1<f64>) -> Array1<f64> {
    arr.iter()
        .scan(0.0, |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

/// Returns the sample differences of `x`, with a leading zero
pub fn diff(x: &Array1<f64>) -> Array1<f64> {
    Array::from_iter(
        std::iter::once(0.0).chain(x.iter().tuple_windows().map(|(a, b)| b - a)),
    )
}

/// Deserializes an [`Array1`] from either a plain list or ndarray's own
/// `{v, dim, data}` layout
pub fn deserialize_array1<'de, D>(deserializer: D) -> Result<Array1<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Array1Repr {
        List(Vec<f64>),
        NdArray(Array1<f64>),
    }
    Ok(match Array1Repr::deserialize(deserializer)? {
        Array1Repr::List(vals) => Array1::from(vals),
        Array1Repr::NdArray(arr) => arr,
    })
}
