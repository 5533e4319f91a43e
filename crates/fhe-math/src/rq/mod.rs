//! Polynomials in R_q\[x\] = (ZZ_q1 x ... x ZZ_qn)\[x\] where the qi's are
//! prime moduli in zq.

mod context;
mod ops;
pub mod traits;

pub use context::Context;

use crate::{ntt::NttOperator, zq::Modulus, Error, Result};
use fhe_util::sample_vec_cbd;
use itertools::izip;
use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2, Zip};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use traits::TryConvertFrom;
use zeroize::Zeroize;

/// Possible representations of the underlying polynomial.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// This is the list of coefficients ci, such that the polynomial is c0 + c1
    /// * x + ... + c_(degree - 1) * x^(degree - 1)
    #[default]
    PowerBasis,
    /// This is the NTT representation of the PowerBasis representation.
    Ntt,
}

/// Struct that holds a polynomial for a specific context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    ctx: Arc<Context>,
    representation: Representation,
    coefficients: Array2<u64>,
}

impl Zeroize for Poly {
    fn zeroize(&mut self) {
        match self.coefficients.as_slice_mut() {
            Some(coefficients) => coefficients.zeroize(),
            None => self.coefficients.fill(0),
        }
    }
}

impl AsRef<Poly> for Poly {
    fn as_ref(&self) -> &Poly {
        self
    }
}

impl AsMut<Poly> for Poly {
    fn as_mut(&mut self) -> &mut Poly {
        self
    }
}

/// Apply `f` to every row of the coefficient matrix together with the
/// matching modulus and NTT operator.
fn for_each_row<F>(coefficients: &mut Array2<u64>, ctx: &Context, f: F)
where
    F: Fn(&mut [u64], &Modulus, &NttOperator),
{
    izip!(coefficients.outer_iter_mut(), ctx.q.iter(), ctx.ops.iter()).for_each(
        |(mut row, qi, op)| match row.as_slice_mut() {
            Some(slice) => f(slice, qi, op),
            None => {
                let mut tmp = row.to_vec();
                f(&mut tmp, qi, op);
                row.assign(&Array1::from(tmp));
            }
        },
    );
}

impl Poly {
    /// Creates a polynomial holding the constant 0.
    pub fn zero(ctx: &Arc<Context>, representation: Representation) -> Self {
        Self {
            ctx: ctx.clone(),
            representation,
            coefficients: Array2::zeros((ctx.q.len(), ctx.degree)),
        }
    }

    /// Current representation of the polynomial.
    pub const fn representation(&self) -> &Representation {
        &self.representation
    }

    /// Context of the polynomial.
    pub const fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Returns a view of the coefficients, one row per modulus.
    pub fn coefficients(&self) -> ArrayView2<u64> {
        self.coefficients.view()
    }

    /// Returns a mutable view of the coefficients, one row per modulus.
    ///
    /// Callers must keep every entry of row i reduced modulo the i-th modulus.
    pub fn coefficients_mut(&mut self) -> ArrayViewMut2<u64> {
        self.coefficients.view_mut()
    }

    /// Change the representation of the underlying polynomial.
    pub fn change_representation(&mut self, to: Representation) {
        match (self.representation, to) {
            (Representation::PowerBasis, Representation::Ntt) => {
                for_each_row(&mut self.coefficients, &self.ctx, |v, _, op| {
                    op.forward(v)
                });
            }
            (Representation::Ntt, Representation::PowerBasis) => {
                for_each_row(&mut self.coefficients, &self.ctx, |v, _, op| {
                    op.backward(v)
                });
            }
            _ => {}
        }
        self.representation = to;
    }

    /// Generate a random polynomial.
    pub fn random<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        rng: &mut R,
    ) -> Self {
        let mut p = Poly::zero(ctx, representation);
        izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut row, qi)| {
            row.assign(&Array1::from(qi.random_vec(ctx.degree, rng)))
        });
        p
    }

    /// Generate a small polynomial and convert into the specified
    /// representation.
    ///
    /// Returns an error if the variance does not belong to [1, ..., 16].
    pub fn small<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        variance: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if !(1..=16).contains(&variance) {
            return Err(Error::Default(
                "The variance should be an integer between 1 and 16".to_string(),
            ));
        }

        let coeffs = sample_vec_cbd(ctx.degree, variance, rng)
            .map_err(|e| Error::Default(e.to_string()))?;
        let mut p = Poly::try_convert_from(coeffs.as_slice(), ctx, Representation::PowerBasis)?;
        p.change_representation(representation);
        Ok(p)
    }

    /// Modulus switch down the polynomial by dividing and rounding each
    /// coefficient by the last modulus in the chain, then drops the last
    /// modulus.
    ///
    /// Returns an error if there is no next context or if the representation
    /// is not PowerBasis.
    pub fn mod_switch_down_next(&mut self) -> Result<()> {
        if self.representation != Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                self.representation,
                Representation::PowerBasis,
            ));
        }

        let next_context = self.ctx.next_context.clone().ok_or(Error::InvalidContext)?;

        let last = self.ctx.q.len() - 1;
        let q_last = &self.ctx.q[last];
        let last_row = self.coefficients.row(last).mapv(|x| q_last.center(x));

        let mut coefficients = Array2::zeros((last, self.ctx.degree));
        izip!(
            coefficients.outer_iter_mut(),
            self.coefficients.outer_iter(),
            self.ctx.q[..last].iter(),
            self.ctx.inv_last_qi_mod_qj.iter()
        )
        .for_each(|(mut out, row, qi, inv)| {
            Zip::from(&mut out)
                .and(&row)
                .and(&last_row)
                .for_each(|o, x, r| *o = qi.mul(qi.sub(*x, qi.reduce_i64(*r)), *inv));
        });

        self.coefficients = coefficients;
        self.ctx = next_context;
        Ok(())
    }

    /// Drops the trailing moduli so that the polynomial lives in `ctx`.
    ///
    /// This is valid in both representations. Returns an error if `ctx` is
    /// not obtained from the current context by dropping trailing moduli.
    pub fn mod_drop_to(&mut self, ctx: &Arc<Context>) -> Result<()> {
        if !ctx.is_prefix_of(&self.ctx) {
            return Err(Error::InvalidContext);
        }
        let rows = ctx.q.len();
        if rows < self.ctx.q.len() {
            self.coefficients = self.coefficients.slice(ndarray::s![..rows, ..]).to_owned();
        }
        self.ctx = ctx.clone();
        Ok(())
    }

    /// Returns the polynomial restricted to the moduli of `ctx`.
    ///
    /// Every modulus of `ctx` must be a modulus of the current context; the
    /// representation is preserved.
    pub fn restrict_to(&self, ctx: &Arc<Context>) -> Result<Poly> {
        if ctx.degree != self.ctx.degree {
            return Err(Error::InvalidContext);
        }
        let mut p = Poly::zero(ctx, self.representation);
        for (mut row, qi) in izip!(p.coefficients.outer_iter_mut(), ctx.moduli.iter()) {
            let index = self
                .ctx
                .moduli
                .iter()
                .position(|m| m == qi)
                .ok_or(Error::InvalidContext)?;
            row.assign(&self.coefficients.row(index));
        }
        Ok(p)
    }

    /// Multiplies the polynomial by a signed integer constant.
    pub fn scalar_mul(&mut self, c: i64) {
        for_each_row(&mut self.coefficients, &self.ctx, |v, qi, _| {
            qi.scalar_mul_vec(v, qi.reduce_i64(c))
        });
    }

    /// Adds a signed integer constant to the polynomial.
    pub fn add_constant(&mut self, c: i64) {
        match self.representation {
            Representation::PowerBasis => {
                izip!(self.coefficients.outer_iter_mut(), self.ctx.q.iter()).for_each(
                    |(mut row, qi)| row[0] = qi.add(row[0], qi.reduce_i64(c)),
                );
            }
            Representation::Ntt => {
                // A constant polynomial evaluates to itself at every root.
                for_each_row(&mut self.coefficients, &self.ctx, |v, qi, _| {
                    let c = qi.reduce_i64(c);
                    v.iter_mut().for_each(|vi| *vi = qi.add(*vi, c));
                });
            }
        }
    }

    /// Applies the ring automorphism x -> x^element.
    ///
    /// Returns an error if the polynomial is not in PowerBasis representation
    /// or if `element` is not an odd integer smaller than 2 * degree.
    pub fn substitute(&self, element: usize) -> Result<Poly> {
        if self.representation != Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                self.representation,
                Representation::PowerBasis,
            ));
        }
        let degree = self.ctx.degree;
        if element % 2 == 0 || element >= 2 * degree {
            return Err(Error::Default(format!(
                "Invalid substitution element {element}"
            )));
        }

        let mut q = Poly::zero(&self.ctx, Representation::PowerBasis);
        izip!(
            q.coefficients.outer_iter_mut(),
            self.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut out, row, qi)| {
            for (i, c) in row.iter().enumerate() {
                let j = (i * element) % (2 * degree);
                if j < degree {
                    out[j] = qi.add(out[j], *c);
                } else {
                    out[j - degree] = qi.sub(out[j - degree], *c);
                }
            }
        });
        Ok(q)
    }
}
