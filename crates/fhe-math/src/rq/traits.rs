//! Traits used for the polynomial ring.

use super::{Context, Poly, Representation};
use crate::{Error, Result};
use itertools::izip;
use ndarray::{Array1, Array2};
use std::sync::Arc;

/// Conversions.
///
/// We use a custom trait to support the polynomial context.
pub trait TryConvertFrom<T>
where
    Self: Sized,
{
    /// Attempt to convert the `value` into a polynomial with a specific
    /// context and, if the representation is not provided, PowerBasis.
    fn try_convert_from<R>(value: T, ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>;
}

/// Convert a vector of signed coefficients, reduced modulo every modulus of
/// the context.
impl TryConvertFrom<&[i64]> for Poly {
    fn try_convert_from<R>(v: &[i64], ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        if v.len() > ctx.degree {
            return Err(Error::InvalidSize {
                expected: ctx.degree,
                got: v.len(),
            });
        }
        let mut p = Poly::zero(ctx, representation.into().unwrap_or_default());
        izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut row, qi)| {
            for (c, vi) in row.iter_mut().zip(v) {
                *c = qi.reduce_i64(*vi);
            }
        });
        Ok(p)
    }
}

/// Convert a vector of unsigned values.
///
/// A vector of `degree` values is read as integers reduced modulo every
/// modulus; a vector of `degree * moduli.len()` values is read as the rows of
/// the coefficient matrix.
impl TryConvertFrom<&[u64]> for Poly {
    fn try_convert_from<R>(v: &[u64], ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        let representation = representation.into().unwrap_or_default();
        if v.len() == ctx.degree {
            let mut p = Poly::zero(ctx, representation);
            izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut row, qi)| {
                row.assign(&Array1::from_iter(v.iter().map(|vi| qi.reduce(*vi))))
            });
            Ok(p)
        } else if v.len() == ctx.degree * ctx.q.len() {
            let coefficients = Array2::from_shape_vec((ctx.q.len(), ctx.degree), v.to_vec())
                .map_err(|e| Error::Default(e.to_string()))?;
            Poly::try_convert_from(coefficients, ctx, representation)
        } else {
            Err(Error::InvalidSize {
                expected: ctx.degree * ctx.q.len(),
                got: v.len(),
            })
        }
    }
}

/// Convert a matrix of residues, one row per modulus.
impl TryConvertFrom<Array2<u64>> for Poly {
    fn try_convert_from<R>(a: Array2<u64>, ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        if a.dim() != (ctx.q.len(), ctx.degree) {
            return Err(Error::InvalidSize {
                expected: ctx.q.len() * ctx.degree,
                got: a.len(),
            });
        }
        let reduced = izip!(a.outer_iter(), ctx.q.iter())
            .all(|(row, qi)| row.iter().all(|c| *c < qi.modulus()));
        if !reduced {
            return Err(Error::Default(
                "The coefficients are not reduced modulo the moduli".to_string(),
            ));
        }
        Ok(Poly {
            ctx: ctx.clone(),
            representation: representation.into().unwrap_or_default(),
            coefficients: a,
        })
    }
}
