//! Numerical differentiation and Savitzky-Golay smoothing.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("window length {0} must be odd and at least 1")]
    EvenWindow(usize),
    #[error("polynomial degree {degree} must be smaller than window length {window}")]
    DegreeTooHigh { window: usize, degree: usize },
}

/// Gradient with centred differences in the interior and one-sided
/// differences at both ends.
///
/// NaN marks a gap. A gap sample has no derivative, and its neighbours fall
/// back to the one-sided difference away from it. A sample with gaps on both
/// sides has none either.
pub fn gradient(values: &[f64], dt: f64) -> Vec<f64> {
    if let [v] = values {
        return vec![if v.is_nan() { f64::NAN } else { 0.0 }];
    }
    let known = |i: usize| values.get(i).copied().filter(|v| !v.is_nan());
    (0..values.len())
        .map(|i| {
            let Some(here) = known(i) else { return f64::NAN };
            match (i.checked_sub(1).and_then(known), known(i + 1)) {
                (Some(before), Some(after)) => (after - before) / (2.0 * dt),
                (None, Some(after)) => (after - here) / dt,
                (Some(before), None) => (here - before) / dt,
                (None, None) => f64::NAN,
            }
        })
        .collect()
}

/// Local least-squares polynomial smoother.
///
/// The first and last half-windows are evaluated on the polynomial fitted to
/// the first and last full window, so any polynomial of degree `<= degree`
/// passes through unchanged.
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    degree: usize,
    // (degree + 1) x window: maps window samples to polynomial coefficients
    projection: Vec<Vec<f64>>,
    center: Vec<f64>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, degree: usize) -> Result<Self, FilterError> {
        if window % 2 == 0 {
            return Err(FilterError::EvenWindow(window));
        }
        if degree >= window {
            return Err(FilterError::DegreeTooHigh { window, degree });
        }
        let projection = least_squares_projection(window, degree);
        let mut filter = Self { window, degree, projection, center: Vec::new() };
        filter.center = filter.weights_at(0.0);
        Ok(filter)
    }

    pub fn window(&self) -> usize { self.window }

    pub fn degree(&self) -> usize { self.degree }

    /// Identity when the signal is not longer than the window.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        let w = self.window;
        if n <= w {
            return signal.to_vec();
        }
        let half = w / 2;
        let mut out = vec![0.0; n];

        for i in half..n - half {
            out[i] = dot(&self.center, &signal[i - half..i + half + 1]);
        }

        let head = &signal[..w];
        let tail = &signal[n - w..];
        for i in 0..half {
            out[i] = dot(&self.weights_at(i as f64 - half as f64), head);
            let j = n - half + i;
            out[j] = dot(&self.weights_at((i + 1) as f64), tail);
        }
        out
    }

    /// Weights that evaluate the fitted polynomial at offset `t` from the
    /// window centre.
    fn weights_at(&self, t: f64) -> Vec<f64> {
        let mut weights = vec![0.0; self.window];
        let mut power = 1.0;
        for row in &self.projection {
            for (w, p) in weights.iter_mut().zip(row) {
                *w += power * p;
            }
            power *= t;
        }
        weights
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

/// Solves `(AᵀA) P = Aᵀ` for the Vandermonde matrix `A` of the centred
/// window positions, by Gauss-Jordan elimination with partial pivoting.
fn least_squares_projection(window: usize, degree: usize) -> Vec<Vec<f64>> {
    let m = degree + 1;
    let half = (window / 2) as f64;
    let xs: Vec<f64> = (0..window).map(|i| i as f64 - half).collect();

    // augmented [AᵀA | Aᵀ]
    let mut aug: Vec<Vec<f64>> = (0..m)
        .map(|r| {
            let mut row: Vec<f64> = (0..m).map(|c| xs.iter().map(|x| x.powi((r + c) as i32)).sum()).collect();
            row.extend(xs.iter().map(|x| x.powi(r as i32)));
            row
        })
        .collect();

    for col in 0..m {
        let pivot = (col..m)
            .max_by(|&a, &b| aug[a][col].abs().total_cmp(&aug[b][col].abs()))
            .unwrap_or(col);
        aug.swap(col, pivot);
        let p = aug[col][col];
        for v in aug[col].iter_mut() {
            *v /= p;
        }
        let pivot_row = aug[col].clone();
        for (r, row) in aug.iter_mut().enumerate() {
            let factor = row[col];
            if r == col || factor == 0.0 { continue; }
            for (v, p) in row.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
        }
    }

    aug.into_iter().map(|row| row[m..].to_vec()).collect()
}
