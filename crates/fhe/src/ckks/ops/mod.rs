//! Operations over ciphertexts

mod chebyshev;
mod mul;

pub use chebyshev::{
    chebyshev_coefficients, chebyshev_depth, eval_chebyshev_function, eval_chebyshev_series,
};
pub use mul::{add_const, mul, mul_const_to_scale, mul_integer};

use crate::ckks::ciphertext::scales_match;
use crate::ckks::{Ciphertext, EvaluationKey};
use crate::{Error, Result};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

impl AddAssign<&Ciphertext> for Ciphertext {
    fn add_assign(&mut self, rhs: &Ciphertext) {
        assert_eq!(self.par, rhs.par);
        assert_eq!(self.level, rhs.level);
        assert_eq!(self.c.len(), rhs.c.len());
        assert!(
            scales_match(self.scale, rhs.scale),
            "Scale mismatch: {} and {}",
            self.scale,
            rhs.scale
        );
        self.c
            .iter_mut()
            .zip(rhs.c.iter())
            .for_each(|(c1i, c2i)| *c1i += c2i);
    }
}

impl Add<&Ciphertext> for &Ciphertext {
    type Output = Ciphertext;

    fn add(self, rhs: &Ciphertext) -> Ciphertext {
        let mut self_clone = self.clone();
        self_clone += rhs;
        self_clone
    }
}

impl SubAssign<&Ciphertext> for Ciphertext {
    fn sub_assign(&mut self, rhs: &Ciphertext) {
        assert_eq!(self.par, rhs.par);
        assert_eq!(self.level, rhs.level);
        assert_eq!(self.c.len(), rhs.c.len());
        assert!(
            scales_match(self.scale, rhs.scale),
            "Scale mismatch: {} and {}",
            self.scale,
            rhs.scale
        );
        self.c
            .iter_mut()
            .zip(rhs.c.iter())
            .for_each(|(c1i, c2i)| *c1i -= c2i);
    }
}

impl Sub<&Ciphertext> for &Ciphertext {
    type Output = Ciphertext;

    fn sub(self, rhs: &Ciphertext) -> Ciphertext {
        let mut self_clone = self.clone();
        self_clone -= rhs;
        self_clone
    }
}

impl Neg for &Ciphertext {
    type Output = Ciphertext;

    fn neg(self) -> Ciphertext {
        let c = self.c.iter().map(|c1i| -c1i).collect();
        Ciphertext {
            par: self.par.clone(),
            c,
            level: self.level,
            scale: self.scale,
        }
    }
}

/// Drop the ciphertext at the lowest level so that both ciphertexts are at
/// the same level.
pub fn align_levels(a: &mut Ciphertext, b: &mut Ciphertext) -> Result<()> {
    if a.par != b.par {
        return Err(Error::incompatible_parameters());
    }
    match a.level.cmp(&b.level) {
        std::cmp::Ordering::Less => a.mod_drop_to_level(b.level),
        std::cmp::Ordering::Greater => b.mod_drop_to_level(a.level),
        std::cmp::Ordering::Equal => Ok(()),
    }
}

fn check_compatible(a: &Ciphertext, b: &Ciphertext) -> Result<()> {
    if a.c.len() != b.c.len() {
        return Err(Error::DefaultError(format!(
            "Ciphertexts of different sizes: {} and {}",
            a.c.len(),
            b.c.len()
        )));
    }
    if !scales_match(a.scale, b.scale) {
        return Err(Error::ScaleMismatch(a.scale, b.scale));
    }
    Ok(())
}

/// Add two ciphertexts, dropping the one at the lowest level first.
pub fn add(a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
    let mut a = a.clone();
    let mut b = b.clone();
    align_levels(&mut a, &mut b)?;
    check_compatible(&a, &b)?;
    a += &b;
    Ok(a)
}

/// Subtract two ciphertexts, dropping the one at the lowest level first.
pub fn sub(a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
    let mut a = a.clone();
    let mut b = b.clone();
    align_levels(&mut a, &mut b)?;
    check_compatible(&a, &b)?;
    a -= &b;
    Ok(a)
}

/// Rotate the slots of a ciphertext by `steps` positions to the left.
pub fn rotate(ct: &Ciphertext, steps: usize, ek: &EvaluationKey) -> Result<Ciphertext> {
    if ct.par != ek.par {
        return Err(Error::incompatible_parameters());
    }
    let element = ct.par.rotation_element(steps);
    if element == 1 {
        return Ok(ct.clone());
    }
    ek.galois_key(element)?.relinearize(ct)
}

/// Sum all the slots of a ciphertext; every slot of the result holds the sum.
pub fn eval_sum(ct: &Ciphertext, ek: &EvaluationKey) -> Result<Ciphertext> {
    let mut out = ct.clone();
    for t in 0..ct.par.slots().trailing_zeros() {
        let rotated = rotate(&out, 1 << t, ek)?;
        out += &rotated;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{add, align_levels, eval_sum, rotate, sub};
    use crate::ckks::{Ciphertext, CkksParameters, Encoding, EvaluationKey, Plaintext, SecretKey};
    use crate::Error;
    use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
    use rand::thread_rng;
    use std::error::Error as StdError;

    fn encrypt(
        values: &[f64],
        level: usize,
        sk: &SecretKey,
        params: &std::sync::Arc<CkksParameters>,
    ) -> Result<Ciphertext, Box<dyn StdError>> {
        let mut rng = thread_rng();
        let pt = Plaintext::try_encode(values, Encoding::at_level(level), params)?;
        Ok(sk.try_encrypt(&pt, &mut rng)?)
    }

    fn decrypt(ct: &Ciphertext, sk: &SecretKey) -> Result<Vec<f64>, Box<dyn StdError>> {
        Ok(Vec::<f64>::try_decode(&sk.try_decrypt(ct)?, None)?)
    }

    #[test]
    fn add_sub_neg() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(2, 64)?;
        let sk = SecretKey::random(&params, &mut rng);
        let a = [6.0, 2.0, 5.0];
        let b = [3.0, 7.0, -1.0];
        let ct_a = encrypt(&a, 0, &sk, &params)?;
        let ct_b = encrypt(&b, 1, &sk, &params)?;

        let sum = add(&ct_a, &ct_b)?;
        assert_eq!(sum.level, 1);
        let diff = sub(&ct_a, &ct_b)?;
        let neg = -&ct_a;
        for (i, ((s, d), n)) in decrypt(&sum, &sk)?
            .iter()
            .zip(decrypt(&diff, &sk)?.iter())
            .zip(decrypt(&neg, &sk)?.iter())
            .take(3)
            .enumerate()
        {
            assert!((s - (a[i] + b[i])).abs() < 1e-6);
            assert!((d - (a[i] - b[i])).abs() < 1e-6);
            assert!((n + a[i]).abs() < 1e-6);
        }

        let mut x = ct_a.clone();
        let mut y = ct_b.clone();
        align_levels(&mut x, &mut y)?;
        assert_eq!(x.level, y.level);
        let total = &(&x + &y) - &y;
        for (t, v) in decrypt(&total, &sk)?.iter().zip(a.iter()) {
            assert!((t - v).abs() < 1e-6);
        }

        let mut z = ct_a.clone();
        z.scale *= 2.0;
        assert!(matches!(add(&z, &ct_b), Err(Error::ScaleMismatch(_, _))));
        Ok(())
    }

    #[test]
    fn rotate_and_sum() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(1, 64)?;
        let sk = SecretKey::random(&params, &mut rng);
        let ek = EvaluationKey::new(&sk, &mut rng)?;
        let values = [6.0, 2.0, 5.0, 3.0, 7.0];
        let ct = encrypt(&values, 0, &sk, &params)?;

        let rotated = rotate(&ct, 2, &ek)?;
        let decoded = decrypt(&rotated, &sk)?;
        assert!((decoded[0] - 5.0).abs() < 1e-4);
        assert!((decoded[2] - 7.0).abs() < 1e-4);
        assert!(rotate(&ct, 3, &ek).is_err());
        assert_eq!(rotate(&ct, 0, &ek)?, ct);

        let sum = eval_sum(&ct, &ek)?;
        for d in decrypt(&sum, &sk)? {
            assert!((d - 23.0).abs() < 1e-3);
        }
        Ok(())
    }
}
