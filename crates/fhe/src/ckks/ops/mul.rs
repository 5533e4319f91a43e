use crate::ckks::{Ciphertext, EvaluationKey};
use crate::{Error, Result};
use num_traits::ToPrimitive;

use super::align_levels;

/// Multiply two ciphertexts, relinearize and rescale the product.
///
/// The ciphertexts are first brought to the same level; the scale of the
/// result is the product of the scales divided by the dropped modulus.
pub fn mul(a: &Ciphertext, b: &Ciphertext, ek: &EvaluationKey) -> Result<Ciphertext> {
    if a.par != ek.par {
        return Err(Error::incompatible_parameters());
    }
    if a.c.len() != 2 || b.c.len() != 2 {
        return Err(Error::DefaultError(
            "Multiplication is only supported for ciphertexts of size 2".to_string(),
        ));
    }
    let mut a = a.clone();
    let mut b = b.clone();
    align_levels(&mut a, &mut b)?;
    if a.levels_left() == 0 {
        return Err(Error::InsufficientLevels {
            required: 1,
            available: 0,
        });
    }

    let c0 = &a.c[0] * &b.c[0];
    let mut c1 = &a.c[0] * &b.c[1];
    c1 += &(&a.c[1] * &b.c[0]);
    let c2 = &a.c[1] * &b.c[1];

    let mut product = Ciphertext {
        par: a.par.clone(),
        c: vec![c0, c1, c2],
        level: a.level,
        scale: a.scale * b.scale,
    };
    ek.relinearization_key.relinearizes(&mut product)?;
    product.rescale()?;
    Ok(product)
}

/// Multiply a ciphertext by a signed integer; the scale is unchanged.
pub fn mul_integer(ct: &Ciphertext, k: i64) -> Ciphertext {
    let mut out = ct.clone();
    out.c.iter_mut().for_each(|ci| ci.scalar_mul(k));
    out
}

/// Multiply a ciphertext by a real constant and rescale, so that the result
/// has exactly the scale `target_scale`.
///
/// The constant is encoded as the integer closest to
/// `c * q_last * target_scale / scale`, which consumes one level.
pub fn mul_const_to_scale(ct: &Ciphertext, c: f64, target_scale: f64) -> Result<Ciphertext> {
    if ct.levels_left() == 0 {
        return Err(Error::InsufficientLevels {
            required: 1,
            available: 0,
        });
    }
    let q_last = ct.par.moduli[ct.par.max_level() - ct.level] as f64;
    let k = (c * q_last * target_scale / ct.scale).round();
    let k = k
        .to_i64()
        .ok_or(Error::EncodingOverflow(c, target_scale))?;

    let mut out = mul_integer(ct, k);
    out.rescale()?;
    out.scale = target_scale;
    Ok(out)
}

/// Add a real constant to every slot of a ciphertext.
pub fn add_const(ct: &Ciphertext, c: f64) -> Result<Ciphertext> {
    let v = (c * ct.scale).round();
    let v = v.to_i64().ok_or(Error::EncodingOverflow(c, ct.scale))?;
    let mut out = ct.clone();
    out.c[0].add_constant(v);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{add_const, mul, mul_const_to_scale, mul_integer};
    use crate::ckks::{Ciphertext, CkksParameters, Encoding, EvaluationKey, Plaintext, SecretKey};
    use crate::Error;
    use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
    use rand::thread_rng;
    use std::error::Error as StdError;

    #[test]
    fn multiplication() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(3, 64)?;
        let sk = SecretKey::random(&params, &mut rng);
        let ek = EvaluationKey::new(&sk, &mut rng)?;

        let a = [1.5, -2.0, 3.0, 0.25];
        let b = [2.0, 0.5, -1.0, 4.0];
        let ct_a: Ciphertext =
            sk.try_encrypt(&Plaintext::try_encode(a.as_slice(), Encoding::new(), &params)?, &mut rng)?;
        let ct_b: Ciphertext = sk.try_encrypt(
            &Plaintext::try_encode(b.as_slice(), Encoding::at_level(1), &params)?,
            &mut rng,
        )?;

        let ab = mul(&ct_a, &ct_b, &ek)?;
        assert_eq!(ab.level, 2);
        let abb = mul(&ab, &ct_b, &ek)?;
        assert_eq!(abb.level, 3);
        assert!(matches!(
            mul(&abb, &ct_b, &ek),
            Err(Error::InsufficientLevels { .. })
        ));

        let decoded_ab = Vec::<f64>::try_decode(&sk.try_decrypt(&ab)?, None)?;
        let decoded_abb = Vec::<f64>::try_decode(&sk.try_decrypt(&abb)?, None)?;
        for i in 0..a.len() {
            assert!((decoded_ab[i] - a[i] * b[i]).abs() < 1e-4);
            assert!((decoded_abb[i] - a[i] * b[i] * b[i]).abs() < 1e-4);
        }
        Ok(())
    }

    #[test]
    fn constants() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(2, 64)?;
        let sk = SecretKey::random(&params, &mut rng);
        let a = [1.5, -2.0, 3.0];
        let ct: Ciphertext =
            sk.try_encrypt(&Plaintext::try_encode(a.as_slice(), Encoding::new(), &params)?, &mut rng)?;

        let doubled = mul_integer(&ct, 2);
        assert_eq!(doubled.scale, ct.scale);
        let scaled = mul_const_to_scale(&ct, 0.1, params.scale())?;
        assert_eq!(scaled.level, 1);
        assert_eq!(scaled.scale, params.scale());
        let shifted = add_const(&scaled, -1.0)?;

        let decoded_doubled = Vec::<f64>::try_decode(&sk.try_decrypt(&doubled)?, None)?;
        let decoded_shifted = Vec::<f64>::try_decode(&sk.try_decrypt(&shifted)?, None)?;
        for i in 0..a.len() {
            assert!((decoded_doubled[i] - 2.0 * a[i]).abs() < 1e-6);
            assert!((decoded_shifted[i] - (0.1 * a[i] - 1.0)).abs() < 1e-6);
        }
        // The constant is added to every slot.
        assert!((decoded_shifted[a.len()] + 1.0).abs() < 1e-6);

        let last = mul_const_to_scale(&scaled, 2.0, params.scale())?;
        assert!(mul_const_to_scale(&last, 2.0, params.scale()).is_err());
        Ok(())
    }
}
