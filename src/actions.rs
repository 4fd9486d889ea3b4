use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HASH_LENGTH_MINIMUM: usize = 8;

#[derive(Error, Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[error("{0}")]
pub struct HashLengthError(String);

/// A newtype wrapper for specifying the length of a pseudo-identifier.
/// The internal value represents the number of characters the hash should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct HashLength(pub(crate) usize);

impl HashLength {
    /// Creates a new [`HashLength`] instance.
    ///
    /// # Arguments
    /// * `length` - The desired length of the hash in characters
    ///
    /// # Returns
    /// * `Ok(HashLength)` if length is valid (>= `HASH_LENGTH_MINIMUM`, which is `8`)
    /// * `Err(HashLengthError)` if length is too short
    pub fn new(length: usize) -> Result<Self, HashLengthError> {
        if length < HASH_LENGTH_MINIMUM {
            return Err(HashLengthError(format!(
                "hash length must be at least {}",
                HASH_LENGTH_MINIMUM
            )));
        }
        Ok(HashLength(length))
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

impl Default for HashLength {
    fn default() -> Self {
        HashLength(16)
    }
}

impl From<HashLengthError> for ConfigError {
    fn from(err: HashLengthError) -> Self {
        ConfigError::InvalidHashLength(err.0)
    }
}

impl TryFrom<usize> for HashLength {
    type Error = HashLengthError;

    fn try_from(value: usize) -> Result<Self, HashLengthError> {
        let hash_length = HashLength::new(value)?;
        Ok(hash_length)
    }
}

impl From<HashLength> for usize {
    fn from(length: HashLength) -> Self {
        length.0
    }
}

/// What the direct-field pass does with a field that is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Overwrite the value with a fixed placeholder.
    Replace(&'static str),

    /// Read the value for reporting, leave it in place.
    Keep,
}

impl Action {
    /// The value the field holds after the action was applied to `previous`.
    pub fn apply<'a>(&self, previous: &'a str) -> &'a str {
        match self {
            Action::Replace(placeholder) => *placeholder,
            Action::Keep => previous,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Action::Replace(_))
    }
}
