pub mod primes;
pub mod sampling;

pub use primes::{chain_primes, inv_mod_prime, is_ntt_friendly_prime, is_prime, mul_mod, pow_mod};
pub use sampling::{gaussian_coefficients, ternary_coefficients, uniform_residues};
