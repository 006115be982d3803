use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::Error;

/// Length of a secret key in bytes (AES-128).
pub const KEY_LEN: usize = 16;

/// Raw key material for one identifier type.
///
/// The bytes are used as the AES-128 key exactly as given, with no hashing or
/// derivation, so a key stored in a database column works unchanged. The
/// buffer is wiped on drop and never shows up in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Creates a key from exactly [`KEY_LEN`] bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        SecretKey(bytes)
    }

    /// Parses a key from 32 hex digits.
    ///
    /// Text that isn't hex fails with [`Error::InvalidKeyEncoding`]; hex of the
    /// wrong length fails with [`Error::InvalidKeyLength`].
    pub fn from_hex(hex_key: &str) -> Result<Self, Error> {
        let mut bytes =
            hex::decode(hex_key.trim()).map_err(|_| Error::InvalidKeyEncoding)?;
        let key = SecretKey::try_from(bytes.as_slice());
        bytes.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for SecretKey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Error> {
        let array: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKeyLength { len: bytes.len() })?;
        Ok(SecretKey(array))
    }
}

impl From<[u8; KEY_LEN]> for SecretKey {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        SecretKey(bytes)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}
