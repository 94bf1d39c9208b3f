use super::{NttTable, RingError, RingResult};
use std::sync::Arc;

/// The full modulus chain of a context: data primes `q_0..q_L` followed by
/// the special key-switching prime `P`.
///
/// A ciphertext at level `l` lives on the prefix `q_0..q_l`. Key-switching
/// keys live on the whole chain and are narrowed to `q_0..q_l, P` on use.
#[derive(Debug)]
pub struct RnsBasis {
    degree: usize,
    tables: Vec<Arc<NttTable>>,
}

impl RnsBasis {
    pub fn new(primes: &[u64], degree: usize) -> RingResult<Self> {
        if primes.len() < 2 {
            return Err(RingError::TooFewPrimes {
                needed: 2,
                got: primes.len(),
            });
        }
        let tables = primes
            .iter()
            .map(|&p| NttTable::new(p, degree).map(Arc::new))
            .collect::<RingResult<Vec<_>>>()?;
        Ok(Self { degree, tables })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Highest ciphertext level, `L`.
    pub fn max_level(&self) -> usize {
        self.tables.len() - 2
    }

    pub fn primes(&self) -> Vec<u64> {
        self.tables.iter().map(|t| t.prime()).collect()
    }

    pub fn special_prime(&self) -> u64 {
        self.special().prime()
    }

    pub(crate) fn special(&self) -> &Arc<NttTable> {
        &self.tables[self.tables.len() - 1]
    }

    /// Moduli `q_0..q_level`.
    pub fn data_moduli(&self, level: usize) -> &[Arc<NttTable>] {
        &self.tables[..=level]
    }

    /// Moduli `q_0..q_level, P`.
    pub fn key_moduli(&self, level: usize) -> Vec<Arc<NttTable>> {
        let mut moduli = self.tables[..=level].to_vec();
        moduli.push(self.special().clone());
        moduli
    }

    /// Every modulus, special prime last.
    pub fn all_moduli(&self) -> &[Arc<NttTable>] {
        &self.tables
    }

    /// Channel indices of `key_moduli(level)` inside `all_moduli()`.
    pub fn key_channels(&self, level: usize) -> Vec<usize> {
        (0..=level).chain(std::iter::once(self.tables.len() - 1)).collect()
    }
}
