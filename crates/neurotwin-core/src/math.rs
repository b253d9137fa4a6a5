//! Numeric helpers shared by the analysis stages
//!
//! All helpers are pure and return `None` (or a documented neutral value)
//! when their inputs cannot produce a meaningful result.

/// Clamp a value to \[0, 1\]. NaN maps to 0.
#[inline]
#[must_use]
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population variance (divides by `n`), `None` for an empty slice.
#[must_use]
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64)
}

/// Ordinary least-squares slope of `values` against the index `0..n`.
///
/// Returns `None` for fewer than two points.
#[must_use]
pub fn ols_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values)?;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }

    Some(num / den)
}

/// Pearson correlation coefficient. Returns 0.0 for degenerate input.
#[must_use]
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom > 0.0 {
        cov / denom
    } else {
        0.0
    }
}

/// Sum of absolute first differences ("line length").
#[must_use]
pub fn line_length(samples: &[f64]) -> f64 {
    samples.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
}
