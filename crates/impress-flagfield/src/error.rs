//! Error types for flag definitions and flag lookups.

use thiserror::Error;

/// Errors raised while resolving a flag definition or looking up flags.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    /// An explicit flag value has more or fewer than one bit set.
    #[error("Flag {value} is not power of 2 (declared as '{name}')")]
    NotPowerOfTwo { name: String, value: u64 },

    /// The same name appears twice after trimming and lowercasing.
    #[error("Flag '{0}' is declared more than once")]
    DuplicateFlag(String),

    /// Two explicit names claim the same bit.
    #[error("Flag '{name}' reuses bit {value}")]
    DuplicateBit { name: String, value: u64 },

    /// Auto-numbering ran out of bits.
    #[error("No free bit left for flag '{0}'")]
    TooManyFlags(String),

    /// A name or token does not match any declared flag.
    #[error("Flag {0} is not known string flag value")]
    UnknownFlag(String),

    /// The declarative configuration could not be read.
    #[error("Invalid flag configuration: {0}")]
    InvalidConfig(String),
}

impl FlagError {
    /// True for errors that come from a broken flag declaration.
    ///
    /// These surface once, when the definition is first resolved, and mean
    /// the record type cannot be used.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            FlagError::NotPowerOfTwo { .. }
                | FlagError::DuplicateFlag(_)
                | FlagError::DuplicateBit { .. }
                | FlagError::TooManyFlags(_)
        )
    }
}

/// Result type alias for flag operations
pub type FlagResult<T> = Result<T, FlagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_power_of_two_display() {
        let err = FlagError::NotPowerOfTwo {
            name: "broken".to_string(),
            value: 3,
        };
        assert!(err.to_string().starts_with("Flag 3 is not power of 2"));
        assert!(err.is_definition_error());
    }

    #[test]
    fn unknown_flag_display() {
        let err = FlagError::UnknownFlag("bogus".to_string());
        assert_eq!(err.to_string(), "Flag bogus is not known string flag value");
        assert!(!err.is_definition_error());
    }
}
