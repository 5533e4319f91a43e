//! Implementation of operations over polynomials.

use super::{Poly, Representation};
use itertools::izip;
use ndarray::Zip;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, p: &Poly) {
        assert_eq!(
            self.representation, p.representation,
            "Incompatible representations"
        );
        assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            Zip::from(&mut v1)
                .and(&v2)
                .for_each(|a, b| *a = qi.add(*a, *b))
        });
    }
}

impl Add<&Poly> for &Poly {
    type Output = Poly;
    fn add(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q += p;
        q
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, p: &Poly) {
        assert_eq!(
            self.representation, p.representation,
            "Incompatible representations"
        );
        assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            Zip::from(&mut v1)
                .and(&v2)
                .for_each(|a, b| *a = qi.sub(*a, *b))
        });
    }
}

impl Sub<&Poly> for &Poly {
    type Output = Poly;
    fn sub(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q -= p;
        q
    }
}

impl MulAssign<&Poly> for Poly {
    fn mul_assign(&mut self, p: &Poly) {
        assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        assert_eq!(
            self.representation,
            Representation::Ntt,
            "Multiplication requires an Ntt representation."
        );
        assert_eq!(
            p.representation,
            Representation::Ntt,
            "Multiplication requires an Ntt representation."
        );
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            Zip::from(&mut v1)
                .and(&v2)
                .for_each(|a, b| *a = qi.mul(*a, *b))
        });
    }
}

impl Mul<&Poly> for &Poly {
    type Output = Poly;
    fn mul(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q *= p;
        q
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        -self.clone()
    }
}

impl Neg for Poly {
    type Output = Poly;

    fn neg(mut self) -> Poly {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.q.iter())
            .for_each(|(mut v, qi)| v.iter_mut().for_each(|vi| *vi = qi.neg(*vi)));
        self
    }
}
