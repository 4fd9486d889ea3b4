//! One-way hashing behind the patient and series pseudo-identifiers.
//!
//! A pseudo-identifier must be stable across runs, so the same patient always lands under
//! the same pseudonym, and must not reveal the identifier it was derived from. The digest is
//! rendered in decimal so that truncated pseudonyms stay valid in numeric-only systems.

use num_bigint::{BigInt, ParseBigIntError};
use num_traits::Num;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Invalid input: {}", .0.to_lowercase())]
    InvalidInput(String),
}

impl From<ParseBigIntError> for Error {
    fn from(err: ParseBigIntError) -> Self {
        Error::InvalidInput(format!("{err}"))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One-way transform used to derive pseudo-identifiers.
///
/// Implementations must be deterministic: the same input always yields the same output.
pub trait Hasher {
    fn hash(&self, input: &str) -> Result<String>;
}

/// [`Hasher`] rendering a BLAKE3 digest as a decimal number.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Blake3Hasher;

impl Blake3Hasher {
    pub fn new() -> Self {
        Self {}
    }
}

impl Hasher for Blake3Hasher {
    fn hash(&self, input: &str) -> Result<String> {
        let bytes = input.as_bytes();
        let hash = blake3::hash(bytes);
        let hash_as_number = BigInt::from_str_radix(hash.to_hex().as_str(), 16)?;
        Ok(hash_as_number.to_string())
    }
}
