use std::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::KeyInit;
use aes::Aes128;

use crate::codec::{self, BLOCK_LEN, SEPARATOR};
use crate::{Error, SecretKey};

/// One namespace of external identifiers: a prefix and the key that belongs to it.
///
/// A `Type` is immutable once built and holds a prepared AES key schedule, so
/// encoding and decoding need no locking and can run from any thread.
#[derive(Clone)]
pub struct Type {
    prefix: String,
    secret_key: SecretKey,
    cipher: Aes128,
}

impl Type {
    /// Creates a new `Type` with the given `prefix` and `secret_key`.
    ///
    /// The prefix must be non-empty and must not contain `_`. The key must be
    /// exactly 16 bytes and is used as-is.
    ///
    /// **Security note:** The key must come from a secure random source. Anyone
    /// who has it can decode and forge identifiers of this type.
    ///
    /// # Examples
    ///
    /// ```
    /// use extid_rs::Type;
    ///
    /// let user = Type::new("user", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]).unwrap();
    /// assert_eq!(user.encode(0), "user_c6a13b37878f5b826f4f8162a1c8d879");
    /// ```
    pub fn new(prefix: &str, secret_key: &[u8]) -> Result<Type, Error> {
        let secret_key = SecretKey::try_from(secret_key)?;
        Type::with_key(prefix, secret_key)
    }

    /// Creates a new `Type` from an already validated key.
    pub fn with_key(prefix: &str, secret_key: SecretKey) -> Result<Type, Error> {
        if prefix.is_empty() || prefix.contains(SEPARATOR) {
            return Err(Error::InvalidPrefix {
                prefix: prefix.to_string(),
            });
        }
        let cipher = Aes128::new(GenericArray::from_slice(secret_key.as_bytes()));
        Ok(Type {
            prefix: prefix.to_string(),
            secret_key,
            cipher,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Encodes `id` into an external identifier such as
    /// `user_13189a6ae4ab07ae70a3aabd30be99de`.
    ///
    /// The output is `prefix.len() + 33` characters long and depends only on
    /// the prefix, the key and `id`.
    pub fn encode(&self, id: i64) -> String {
        let ciphertext = codec::encrypt_id(&self.cipher, id);
        codec::format_external_id(&self.prefix, &ciphertext)
    }

    /// Decodes an external identifier issued by this type.
    ///
    /// Fails with [`Error::PrefixMismatch`] if the identifier carries another
    /// prefix. A well-formed identifier with the right prefix always decodes,
    /// whether or not it was ever issued.
    ///
    /// ```
    /// use extid_rs::Type;
    ///
    /// let user = Type::new("user", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]).unwrap();
    /// assert_eq!(user.decode("user_13189a6ae4ab07ae70a3aabd30be99de").unwrap(), 1);
    /// ```
    pub fn decode(&self, external_id: &str) -> Result<i64, Error> {
        let (prefix, ciphertext) = codec::parse_external_id(external_id)?;
        if prefix != self.prefix {
            return Err(Error::PrefixMismatch {
                received: prefix.to_string(),
                expected: self.prefix.clone(),
            });
        }
        Ok(self.decrypt(&ciphertext))
    }

    pub(crate) fn decrypt(&self, ciphertext: &[u8; BLOCK_LEN]) -> i64 {
        codec::decrypt_id(&self.cipher, ciphertext)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Type")
            .field("prefix", &self.prefix)
            .field("secret_key", &self.secret_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    #[test]
    fn test_new_validates_key() {
        assert_eq!(
            Type::new("user", &KEY[..15]).unwrap_err(),
            Error::InvalidKeyLength { len: 15 }
        );
        let mut long_key = KEY.to_vec();
        long_key.push(16);
        assert_eq!(
            Type::new("user", &long_key).unwrap_err(),
            Error::InvalidKeyLength { len: 17 }
        );
    }

    #[test]
    fn test_new_validates_prefix() {
        for prefix in ["", "user_", "_", "a_b"] {
            assert_eq!(
                Type::new(prefix, &KEY).unwrap_err(),
                Error::InvalidPrefix {
                    prefix: prefix.to_string()
                }
            );
        }
        assert!(Type::new("u", &KEY).is_ok());
    }

    #[test]
    fn test_encode() {
        let user = Type::new("user", &KEY).unwrap();
        assert_eq!(user.encode(i64::MIN), "user_4399572cd6ea5341b8d35876a7098af7");
        assert_eq!(user.encode(-1), "user_25d4e948bd5e1296afc0bf87095a7248");
        assert_eq!(user.encode(i64::MAX), "user_edc17bee21fb24e211e6419412e1c32e");

        // Deterministic, and the length only depends on the prefix.
        assert_eq!(user.encode(12345), user.encode(12345));
        assert_eq!(user.encode(12345).len(), "user".len() + 1 + 32);
    }

    #[test]
    fn test_decode() {
        let user = Type::new("user", &KEY).unwrap();
        assert_eq!(user.decode("user_25d4e948bd5e1296afc0bf87095a7248"), Ok(-1));
        assert_eq!(
            user.decode("order_25d4e948bd5e1296afc0bf87095a7248"),
            Err(Error::PrefixMismatch {
                received: "order".to_string(),
                expected: "user".to_string()
            })
        );
        assert!(matches!(
            user.decode("user_25d4"),
            Err(Error::MalformedIdentifier { .. })
        ));
    }

    #[test]
    fn test_same_key_different_prefix() {
        // The prefix is not mixed into the key, only into the string.
        let user = Type::new("user", &KEY).unwrap();
        let account = Type::new("account", &KEY).unwrap();
        assert_eq!(user.encode(7)[5..], account.encode(7)[8..]);
    }

    #[test]
    fn test_debug_hides_key() {
        let user = Type::new("user", &KEY).unwrap();
        assert_eq!(
            format!("{:?}", user),
            "Type { prefix: \"user\", secret_key: SecretKey([REDACTED]) }"
        );
    }
}
