use thiserror::Error as ThisError;

/// Error returned when constructing types, resolving prefixes or decoding identifiers.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// A secret key was not exactly [`KEY_LEN`](crate::KEY_LEN) bytes long.
    #[error("Secret key must be 16 bytes, got {len}")]
    InvalidKeyLength { len: usize },

    /// A secret key given as text was not valid hex.
    #[error("Secret key is not valid hex")]
    InvalidKeyEncoding,

    /// A prefix was empty or contained the separator.
    #[error("Invalid prefix {prefix:?}")]
    InvalidPrefix { prefix: String },

    /// No type is registered under the prefix.
    #[error("Unknown prefix {prefix:?}")]
    UnknownPrefix { prefix: String },

    /// The external identifier is not `prefix_` followed by 32 hex digits.
    #[error("Malformed identifier: {reason}")]
    MalformedIdentifier { reason: &'static str },

    /// A `Type` was asked to decode an identifier issued under another prefix.
    #[error("Prefix was {received}, expected {expected}")]
    PrefixMismatch { received: String, expected: String },

    /// A type with the same prefix is already registered.
    #[error("Prefix {prefix:?} is already registered")]
    DuplicatePrefix { prefix: String },

    /// The backing key store failed.
    #[error("Key store error: {0}")]
    Backend(String),
}

impl Error {
    /// Returns true if the identifier refers to a type nobody knows about.
    ///
    /// Callers usually map this to "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnknownPrefix { .. })
    }

    /// Returns true if the input string itself was structurally invalid.
    ///
    /// A well-formed identifier of the wrong type (`PrefixMismatch`) is not malformed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedIdentifier { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let unknown = Error::UnknownPrefix {
            prefix: "nosuchtype".to_string(),
        };
        assert!(unknown.is_not_found());
        assert!(!unknown.is_malformed());

        let malformed = Error::MalformedIdentifier {
            reason: "missing separator",
        };
        assert!(malformed.is_malformed());
        assert!(!malformed.is_not_found());

        let mismatch = Error::PrefixMismatch {
            received: "order".to_string(),
            expected: "user".to_string(),
        };
        assert!(!mismatch.is_malformed());
        assert!(!mismatch.is_not_found());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::InvalidKeyLength { len: 15 }.to_string(),
            "Secret key must be 16 bytes, got 15"
        );
        assert_eq!(
            Error::PrefixMismatch {
                received: "order".to_string(),
                expected: "user".to_string()
            }
            .to_string(),
            "Prefix was order, expected user"
        );
    }
}
