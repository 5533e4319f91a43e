//! Evaluation of Chebyshev series over ciphertexts

use std::f64::consts::PI;

use crate::ckks::{Ciphertext, EvaluationKey};
use crate::{Error, Result};

use super::{add, add_const, mul, mul_const_to_scale, mul_integer, sub};

/// Coefficients of the Chebyshev interpolant of degree `degree` of `f` on
/// `[lower, upper]`, computed at the `degree + 1` Chebyshev nodes.
pub fn chebyshev_coefficients<F>(f: F, lower: f64, upper: f64, degree: usize) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    let n = degree + 1;
    let half_width = (upper - lower) / 2.0;
    let center = (upper + lower) / 2.0;
    let angle = |j: usize, k: usize| PI * j as f64 * (k as f64 + 0.5) / n as f64;

    let values = (0..n)
        .map(|k| f(half_width * angle(1, k).cos() + center))
        .collect::<Vec<_>>();

    let mut coefficients = (0..n)
        .map(|j| {
            values
                .iter()
                .enumerate()
                .map(|(k, v)| v * angle(j, k).cos())
                .sum::<f64>()
                * 2.0
                / n as f64
        })
        .collect::<Vec<_>>();
    coefficients[0] /= 2.0;
    coefficients
}

/// Number of levels consumed when evaluating a series of degree `degree`.
pub fn chebyshev_depth(degree: usize) -> usize {
    degree.max(1).next_power_of_two().trailing_zeros() as usize + 2
}

/// Evaluate the Chebyshev series with the given coefficients on a ciphertext
/// whose values lie in `[lower, upper]`.
///
/// The result has the default scale of the parameters.
pub fn eval_chebyshev_series(
    ct: &Ciphertext,
    coefficients: &[f64],
    lower: f64,
    upper: f64,
    ek: &EvaluationKey,
) -> Result<Ciphertext> {
    if coefficients.len() < 2 {
        return Err(Error::TooFewValues(coefficients.len(), 2));
    }
    if !(lower.is_finite() && upper.is_finite() && lower < upper) {
        return Err(Error::UnspecifiedInput(format!(
            "Invalid interval [{lower}, {upper}]"
        )));
    }
    let degree = coefficients.len() - 1;
    let available = ct.levels_left();
    let required = chebyshev_depth(degree);
    if available < required {
        return Err(Error::InsufficientLevels {
            required,
            available,
        });
    }
    let scale = ct.par.scale;

    // t[k] holds T_k of the input mapped to [-1, 1].
    let mut t: Vec<Ciphertext> = Vec::with_capacity(degree + 1);
    let x = mul_const_to_scale(ct, 2.0 / (upper - lower), scale)?;
    t.push(Ciphertext::zero(&ct.par, x.level, scale)?);
    t.push(add_const(&x, -(upper + lower) / (upper - lower))?);

    for k in 2..=degree {
        let m = (k + 1) / 2;
        let l = k / 2;
        let product = mul_integer(&mul(&t[m], &t[l], ek)?, 2);
        let tk = if m == l {
            add_const(&product, -1.0)?
        } else {
            sub(&product, &t[m - l])?
        };
        t.push(tk);
    }

    let level = t.iter().skip(1).map(|tk| tk.level).max().unwrap_or(x.level);
    let mut terms = t
        .iter_mut()
        .zip(coefficients.iter())
        .skip(1)
        .map(|(tk, c)| -> Result<Ciphertext> {
            tk.mod_drop_to_level(level)?;
            mul_const_to_scale(tk, *c, scale)
        });
    let first = terms
        .next()
        .ok_or(Error::TooFewValues(coefficients.len(), 2))??;
    let sum = terms.try_fold(first, |acc, term| -> Result<Ciphertext> {
        add(&acc, &term?)
    })?;
    add_const(&sum, coefficients[0])
}

/// Approximate `f` on `[lower, upper]` by its Chebyshev interpolant of degree
/// `degree`, and evaluate it on a ciphertext.
pub fn eval_chebyshev_function<F>(
    f: F,
    ct: &Ciphertext,
    lower: f64,
    upper: f64,
    degree: usize,
    ek: &EvaluationKey,
) -> Result<Ciphertext>
where
    F: Fn(f64) -> f64,
{
    if degree == 0 {
        return Err(Error::TooFewValues(1, 2));
    }
    let coefficients = chebyshev_coefficients(f, lower, upper, degree);
    eval_chebyshev_series(ct, &coefficients, lower, upper, ek)
}
