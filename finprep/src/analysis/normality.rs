//! D'Agostino-Pearson omnibus normality test.
//!
//! Combines a skewness test and a kurtosis test into `K² = Zs² + Zk²`, which is
//! chi-squared with two degrees of freedom under normality, so the p-value is
//! `exp(-K² / 2)`.

use super::descriptive::central_moments;
use serde::{Deserialize, Serialize};

/// Smallest sample the test accepts.
pub const MIN_SAMPLE_SIZE: usize = 8;

/// Outcome of the omnibus test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    /// The `K²` statistic.
    pub statistic: f64,
    /// Chi-squared (2 dof) survival probability of the statistic.
    pub p_value: f64,
}

impl NormalityTest {
    /// True when normality is not rejected at `alpha`.
    #[must_use]
    pub fn is_normal(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Runs the test. `None` when the sample is too small or has zero variance.
#[must_use]
pub fn dagostino_pearson(values: &[f64]) -> Option<NormalityTest> {
    if values.len() < MIN_SAMPLE_SIZE {
        return None;
    }
    let (m2, m3, m4) = central_moments(values)?;
    if m2 <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;

    let zs = skew_z(n, m3 / m2.powf(1.5));
    let zk = kurtosis_z(n, m4 / (m2 * m2));
    let statistic = zs * zs + zk * zk;
    if statistic.is_nan() {
        return None;
    }
    Some(NormalityTest {
        statistic,
        p_value: (-statistic / 2.0).exp(),
    })
}

fn skew_z(n: f64, b2: f64) -> f64 {
    let mut y = b2 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    if y == 0.0 {
        y = 1.0;
    }
    let ratio = y / alpha;
    delta * (ratio + (ratio * ratio + 1.0).sqrt()).ln()
}

fn kurtosis_z(n: f64, b2: f64) -> f64 {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let var_b2 = 24.0 * n * (n - 2.0) * (n - 3.0)
        / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / var_b2.sqrt();
    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}
