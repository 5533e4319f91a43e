use std::{fmt::Debug, sync::Arc};

use crate::{ntt::NttOperator, zq::Modulus, Error, Result};

/// Struct that holds the context associated with elements in rq.
#[derive(Clone)]
pub struct Context {
    /// List of prime moduli
    pub(crate) moduli: Box<[u64]>,
    /// Modulus operators for each prime
    pub(crate) q: Box<[Modulus]>,
    /// NTT operators for each prime
    pub(crate) ops: Box<[NttOperator]>,
    /// Polynomial degree (must be power of 2)
    pub(crate) degree: usize,
    /// Inverse of last qi modulo qj for modulus switching
    pub(crate) inv_last_qi_mod_qj: Box<[u64]>,
    /// Link to context with one less modulus (for level management)
    pub(crate) next_context: Option<Arc<Context>>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("moduli", &self.moduli)
            .field("degree", &self.degree)
            .finish()
    }
}

// Two contexts are equal when they describe the same ring; the precomputed
// tables are derived from the moduli and the degree.
impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.degree == other.degree && self.moduli == other.moduli
    }
}

impl Eq for Context {}

impl Context {
    /// Creates a context from a list of moduli and a polynomial degree.
    ///
    /// Returns an error if the moduli are not distinct primes less than 62
    /// bits which support the NTT of size `degree`.
    pub fn new(moduli: &[u64], degree: usize) -> Result<Self> {
        if !degree.is_power_of_two() || degree < 8 {
            return Err(Error::Default(
                "The degree is not a power of two larger or equal to 8".to_string(),
            ));
        }
        if moduli.is_empty() {
            return Err(Error::Default("The list of moduli is empty".to_string()));
        }
        if (1..moduli.len()).any(|i| moduli[..i].contains(&moduli[i])) {
            return Err(Error::Default("The moduli are not distinct".to_string()));
        }

        let mut q = Vec::with_capacity(moduli.len());
        let mut ops = Vec::with_capacity(moduli.len());
        for modulus in moduli {
            let qi = Modulus::new(*modulus)?;
            let op = NttOperator::new(&qi, degree).ok_or_else(|| {
                Error::Default("Impossible to construct a Ntt operator".to_string())
            })?;
            q.push(qi);
            ops.push(op);
        }

        let q_last = moduli[moduli.len() - 1];
        let inv_last_qi_mod_qj = q[..q.len() - 1]
            .iter()
            .map(|qi| {
                qi.inv(qi.reduce(q_last))
                    .ok_or_else(|| Error::Default("The moduli are not coprime".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let next_context = if moduli.len() >= 2 {
            Some(Arc::new(Context::new(&moduli[..moduli.len() - 1], degree)?))
        } else {
            None
        };

        Ok(Self {
            moduli: moduli.to_owned().into_boxed_slice(),
            q: q.into_boxed_slice(),
            ops: ops.into_boxed_slice(),
            degree,
            inv_last_qi_mod_qj: inv_last_qi_mod_qj.into_boxed_slice(),
            next_context,
        })
    }

    /// Creates a context in an `Arc`.
    pub fn new_arc(moduli: &[u64], degree: usize) -> Result<Arc<Self>> {
        Self::new(moduli, degree).map(Arc::new)
    }

    /// Returns a reference to the moduli in this context.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns a reference to the moduli as Modulus in this context.
    pub fn moduli_operators(&self) -> &[Modulus] {
        &self.q
    }

    /// Returns the polynomial degree.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the context with the last modulus removed, if any.
    pub fn next_context(&self) -> Option<&Arc<Context>> {
        self.next_context.as_ref()
    }

    /// Returns whether `other` is obtained from this context by dropping
    /// trailing moduli.
    pub fn is_prefix_of(&self, other: &Context) -> bool {
        self.degree == other.degree && other.moduli.starts_with(&self.moduli)
    }

    /// Returns the chain of contexts starting with `ctx` and following
    /// `next_context` down to a single modulus.
    pub fn chain(ctx: &Arc<Context>) -> Vec<Arc<Context>> {
        let mut contexts = vec![ctx.clone()];
        while let Some(next) = contexts[contexts.len() - 1].next_context.clone() {
            contexts.push(next);
        }
        contexts
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, sync::Arc};

    use crate::ntt::supports_ntt;
    use crate::rq::Context;

    const MODULI: &[u64; 5] = &[
        1153,
        4611686018326724609,
        4611686018309947393,
        4611686018232352769,
        4611686018171535361,
    ];

    #[test]
    fn context_constructor() {
        for modulus in MODULI {
            // modulus is = 1 modulo 2 * 8
            assert!(Context::new(&[*modulus], 8).is_ok());

            if supports_ntt(*modulus, 128) {
                assert!(Context::new(&[*modulus], 128).is_ok());
            } else {
                assert!(Context::new(&[*modulus], 128).is_err());
            }
        }

        // All moduli in MODULI are = 1 modulo 2 * 8
        assert!(Context::new(MODULI, 8).is_ok());

        // This should fail since 1153 != 1 moduli 2 * 128
        assert!(Context::new(MODULI, 128).is_err());

        assert!(Context::new(&[], 8).is_err());
        assert!(Context::new(&[1153, 1153], 8).is_err());
        assert!(Context::new(&[1153], 12).is_err());
    }

    #[test]
    fn next_context() -> Result<(), Box<dyn Error>> {
        // A context should have a children pointing to a context with one less modulus.
        let context = Arc::new(Context::new(MODULI, 8)?);
        assert_eq!(
            context.next_context,
            Some(Arc::new(Context::new(&MODULI[..MODULI.len() - 1], 8)?))
        );

        // We can go down the chain of the MODULI.len() - 1 context's.
        let chain = Context::chain(&context);
        assert_eq!(chain.len(), MODULI.len());
        for (i, ctx) in chain.iter().enumerate() {
            assert_eq!(ctx.moduli(), &MODULI[..MODULI.len() - i]);
            assert!(ctx.is_prefix_of(&context));
        }
        assert!(!context.is_prefix_of(&chain[1]));

        Ok(())
    }
}
