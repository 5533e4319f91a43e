//! Plaintext and encoding types for the CKKS encryption scheme.

use crate::ckks::CkksParameters;
use crate::{Error, Result};
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use fhe_traits::{FheDecoder, FheEncoder, FhePlaintext, FhePlaintextEncoding, FheParametrized};
use std::sync::Arc;
use zeroize::Zeroize;

/// An encoding of real values into the slots of a plaintext, at a given level
/// and scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Encoding {
    pub(crate) level: usize,
    pub(crate) scale: Option<f64>,
}

impl Encoding {
    /// An encoding at level 0 with the default scale of the parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoding at the given level with the default scale.
    pub fn at_level(level: usize) -> Self {
        Self { level, scale: None }
    }

    /// Overrides the scale of the encoding.
    pub fn with_scale(self, scale: f64) -> Self {
        Self {
            scale: Some(scale),
            ..self
        }
    }
}

impl FhePlaintextEncoding for Encoding {}

/// A plaintext object, that encodes a vector of real values at a given scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Plaintext {
    /// The parameters of the underlying CKKS encryption scheme.
    pub(crate) par: Arc<CkksParameters>,
    /// The plaintext polynomial, in Ntt representation.
    pub(crate) poly_ntt: Poly,
    /// The level of the plaintext
    pub(crate) level: usize,
    /// The scaling factor of the encoded values
    pub(crate) scale: f64,
}

impl Zeroize for Plaintext {
    fn zeroize(&mut self) {
        self.poly_ntt.zeroize();
    }
}

impl FheParametrized for Plaintext {
    type Parameters = CkksParameters;
}

impl FhePlaintext for Plaintext {
    type Encoding = Encoding;
}

impl Plaintext {
    /// Returns the level of the plaintext.
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Returns the scaling factor of the plaintext.
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the polynomial holding the plaintext, in Ntt representation.
    pub(crate) fn to_poly(&self) -> &Poly {
        &self.poly_ntt
    }

    /// Returns the centered coefficients of the plaintext modulo the first
    /// ciphertext modulus.
    pub(crate) fn centered_coefficients(&self) -> Vec<i64> {
        let mut poly = self.poly_ntt.clone();
        poly.change_representation(Representation::PowerBasis);
        let q0 = &poly.ctx().moduli_operators()[0];
        let coefficients = poly
            .coefficients()
            .row(0)
            .iter()
            .map(|c| q0.center(*c))
            .collect();
        poly.zeroize();
        coefficients
    }
}

impl FheEncoder<&[f64]> for Plaintext {
    type Error = Error;

    fn try_encode(value: &[f64], encoding: Encoding, par: &Arc<CkksParameters>) -> Result<Self> {
        let scale = encoding.scale.unwrap_or(par.scale);
        if !scale.is_finite() || scale < 1.0 {
            return Err(Error::UnspecifiedInput(format!("Invalid scale {scale}")));
        }
        let ctx = par.ctx_at_level(encoding.level)?;
        let coefficients = par.encode_slots(value, scale)?;
        let mut poly =
            Poly::try_convert_from(coefficients.as_slice(), ctx, Representation::PowerBasis)?;
        poly.change_representation(Representation::Ntt);
        Ok(Self {
            par: par.clone(),
            poly_ntt: poly,
            level: encoding.level,
            scale,
        })
    }
}

impl FheEncoder<&Vec<f64>> for Plaintext {
    type Error = Error;

    fn try_encode(value: &Vec<f64>, encoding: Encoding, par: &Arc<CkksParameters>) -> Result<Self> {
        Plaintext::try_encode(value.as_slice(), encoding, par)
    }
}

impl FheDecoder<Plaintext> for Vec<f64> {
    type Error = Error;

    fn try_decode<O>(pt: &Plaintext, encoding: O) -> Result<Self>
    where
        O: Into<Option<Encoding>>,
    {
        if let Some(encoding) = encoding.into() {
            if encoding.level != pt.level {
                return Err(Error::UnspecifiedInput(format!(
                    "Mismatched level: plaintext at level {}, encoding at level {}",
                    pt.level, encoding.level
                )));
            }
        }
        Ok(pt.par.decode_slots(&pt.centered_coefficients(), pt.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::{Encoding, Plaintext};
    use crate::ckks::CkksParameters;
    use fhe_traits::{FheDecoder, FheEncoder};
    use std::error::Error;

    #[test]
    fn encode_decode() -> Result<(), Box<dyn Error>> {
        let params = CkksParameters::default_arc(2, 64)?;
        let values = vec![6.0, -2.5, 0.125, 1000.0];
        for level in 0..=params.max_level() {
            let pt = Plaintext::try_encode(&values, Encoding::at_level(level), &params)?;
            assert_eq!(pt.level(), level);
            assert_eq!(pt.scale(), params.scale());
            let decoded = Vec::<f64>::try_decode(&pt, Encoding::at_level(level))?;
            assert_eq!(decoded.len(), params.slots());
            for (i, d) in decoded.iter().enumerate() {
                let expected = values.get(i).copied().unwrap_or(0.0);
                assert!((d - expected).abs() < 1e-6);
            }
            assert!(Vec::<f64>::try_decode(&pt, Encoding::at_level(level + 1)).is_err());
        }
        Ok(())
    }

    #[test]
    fn custom_scale() -> Result<(), Box<dyn Error>> {
        let params = CkksParameters::default_arc(1, 16)?;
        let pt = Plaintext::try_encode(
            [3.5].as_slice(),
            Encoding::new().with_scale(1024.0 * 1024.0),
            &params,
        )?;
        assert_eq!(pt.scale(), 1024.0 * 1024.0);
        let decoded = Vec::<f64>::try_decode(&pt, None)?;
        assert!((decoded[0] - 3.5).abs() < 1e-3);

        assert!(
            Plaintext::try_encode([1.0].as_slice(), Encoding::new().with_scale(0.0), &params)
                .is_err()
        );
        assert!(Plaintext::try_encode([1.0].as_slice(), Encoding::at_level(2), &params).is_err());
        Ok(())
    }
}
