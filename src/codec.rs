use aes::cipher::{BlockDecrypt, BlockEncrypt};
use aes::{Aes128, Block};

use crate::{Error, KeyStore};

/// Separator between the prefix and the hex ciphertext.
pub const SEPARATOR: char = '_';

/// Size of the cipher block in bytes.
pub const BLOCK_LEN: usize = 16;

/// Number of hex digits in the ciphertext part of an external identifier.
pub const HEX_LEN: usize = BLOCK_LEN * 2;

/// Version of the plaintext block layout.
///
/// Layout 1: bytes 0..8 hold the id as big-endian two's complement, bytes
/// 8..16 are zero. Every implementation sharing keys with this one, including
/// the `encode_extid`/`decode_extid` SQL functions, must use the same layout.
pub const LAYOUT_VERSION: u8 = 1;

const ID_LEN: usize = 8;
const FILLER: [u8; BLOCK_LEN - ID_LEN] = [0; BLOCK_LEN - ID_LEN];

/// Builds the plaintext block for `id`.
fn plaintext_block(id: i64) -> [u8; BLOCK_LEN] {
    let mut block = [0u8; BLOCK_LEN];
    block[..ID_LEN].copy_from_slice(&id.to_be_bytes());
    block[ID_LEN..].copy_from_slice(&FILLER);
    block
}

/// Extracts the id from a plaintext block. The filler is not checked.
fn id_from_block(block: &[u8; BLOCK_LEN]) -> i64 {
    let mut id_bytes = [0u8; ID_LEN];
    id_bytes.copy_from_slice(&block[..ID_LEN]);
    i64::from_be_bytes(id_bytes)
}

/// Encrypts `id` into a single ciphertext block.
pub(crate) fn encrypt_id(cipher: &Aes128, id: i64) -> [u8; BLOCK_LEN] {
    let mut block = Block::from(plaintext_block(id));
    cipher.encrypt_block(&mut block);
    let mut out = [0u8; BLOCK_LEN];
    out.copy_from_slice(&block);
    out
}

/// Decrypts a ciphertext block back into an id.
///
/// Every block decrypts to some id, so a forged block is not detected here.
pub(crate) fn decrypt_id(cipher: &Aes128, ciphertext: &[u8; BLOCK_LEN]) -> i64 {
    let mut block = Block::from(*ciphertext);
    cipher.decrypt_block(&mut block);
    let mut plaintext = [0u8; BLOCK_LEN];
    plaintext.copy_from_slice(&block);
    id_from_block(&plaintext)
}

/// Formats `prefix_hex` with lowercase hex.
pub fn format_external_id(prefix: &str, ciphertext: &[u8; BLOCK_LEN]) -> String {
    let mut out = String::with_capacity(prefix.len() + 1 + HEX_LEN);
    out.push_str(prefix);
    out.push(SEPARATOR);
    out.push_str(&hex::encode(ciphertext));
    out
}

/// Splits an external identifier into its prefix and ciphertext block.
///
/// The split happens at the first separator. The hex part must be exactly
/// [`HEX_LEN`] digits; upper and lower case are both accepted. The prefix is
/// returned as-is and is not checked against any registry.
pub fn parse_external_id(external_id: &str) -> Result<(&str, [u8; BLOCK_LEN]), Error> {
    let (prefix, hex_part) =
        external_id
            .split_once(SEPARATOR)
            .ok_or(Error::MalformedIdentifier {
                reason: "missing separator",
            })?;
    if hex_part.len() != HEX_LEN {
        return Err(Error::MalformedIdentifier {
            reason: "ciphertext must be 32 hex digits",
        });
    }
    let mut ciphertext = [0u8; BLOCK_LEN];
    hex::decode_to_slice(hex_part, &mut ciphertext).map_err(|_| {
        Error::MalformedIdentifier {
            reason: "ciphertext is not valid hex",
        }
    })?;
    Ok((prefix, ciphertext))
}

/// Encoder/decoder that resolves prefixes through a [`KeyStore`].
///
/// # Examples
///
/// ```
/// use extid_rs::{Codec, Registry};
///
/// let registry = Registry::new();
/// registry.register("user", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]).unwrap();
///
/// let codec = Codec::new(&registry);
/// let encoded = codec.encode("user", 1).unwrap();
/// assert_eq!(encoded, "user_13189a6ae4ab07ae70a3aabd30be99de");
/// assert_eq!(codec.decode(&encoded).unwrap(), ("user".to_string(), 1));
/// ```
#[derive(Debug, Clone)]
pub struct Codec<S> {
    store: S,
}

impl<S: KeyStore> Codec<S> {
    pub fn new(store: S) -> Self {
        Codec { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Encodes `id` under the type registered as `prefix`.
    ///
    /// Fails only if the prefix can't be resolved; the encoding itself is total.
    pub fn encode(&self, prefix: &str, id: i64) -> Result<String, Error> {
        let extid_type = self.store.resolve_type(prefix)?;
        Ok(extid_type.encode(id))
    }

    /// Decodes an external identifier into its prefix and id.
    ///
    /// The identifier is checked for shape before the store is consulted, so
    /// malformed input never causes a lookup.
    ///
    /// The scheme carries no integrity tag: any well-formed identifier with a
    /// known prefix decodes to some id, even if nobody ever issued it.
    pub fn decode(&self, external_id: &str) -> Result<(String, i64), Error> {
        let (prefix, ciphertext) = parse_external_id(external_id).map_err(|err| {
            tracing::trace!(error = %err, "rejected external id");
            err
        })?;
        let extid_type = self.store.resolve_type(prefix)?;
        Ok((prefix.to_string(), extid_type.decrypt(&ciphertext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;
    use aes::cipher::KeyInit;
    use rand::{distributions::Uniform, Rng};
    use std::collections::HashSet;

    const KEY: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    const VECTORS: [(i64, &str); 5] = [
        (i64::MIN, "user_4399572cd6ea5341b8d35876a7098af7"),
        (-1, "user_25d4e948bd5e1296afc0bf87095a7248"),
        (0, "user_c6a13b37878f5b826f4f8162a1c8d879"),
        (1, "user_13189a6ae4ab07ae70a3aabd30be99de"),
        (i64::MAX, "user_edc17bee21fb24e211e6419412e1c32e"),
    ];

    fn user_registry() -> Registry {
        let registry = Registry::new();
        registry.register("user", &KEY).unwrap();
        registry
    }

    #[test]
    fn test_block_layout() {
        assert_eq!(
            plaintext_block(1),
            [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            plaintext_block(-1),
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(id_from_block(&plaintext_block(i64::MIN)), i64::MIN);
    }

    #[test]
    fn test_known_vectors() {
        let codec = Codec::new(user_registry());
        for (id, expected) in VECTORS {
            assert_eq!(codec.encode("user", id).unwrap(), expected);
            assert_eq!(
                codec.decode(expected).unwrap(),
                ("user".to_string(), id),
                "Failed at id: {}",
                id
            );
        }
    }

    #[test]
    fn test_block_cipher_matches_vectors() {
        let cipher = Aes128::new_from_slice(&KEY).unwrap();
        let ciphertext = encrypt_id(&cipher, 0);
        assert_eq!(hex::encode(ciphertext), "c6a13b37878f5b826f4f8162a1c8d879");
        assert_eq!(decrypt_id(&cipher, &ciphertext), 0);
    }

    #[test]
    fn test_uppercase_hex_decodes() {
        let codec = Codec::new(user_registry());
        assert_eq!(
            codec.decode("user_13189A6AE4AB07AE70A3AABD30BE99DE").unwrap(),
            ("user".to_string(), 1)
        );
    }

    #[test]
    fn test_decode_errors() {
        let codec = Codec::new(user_registry());

        assert_eq!(
            codec.decode("nosuchtype_13189a6ae4ab07ae70a3aabd30be99de"),
            Err(Error::UnknownPrefix {
                prefix: "nosuchtype".to_string()
            })
        );

        assert!(matches!(
            codec.decode("user_notenoughhex"),
            Err(Error::MalformedIdentifier { .. })
        ));
        assert!(matches!(
            codec.decode("usernounderscore"),
            Err(Error::MalformedIdentifier { .. })
        ));

        // Right length, but not hex.
        assert!(matches!(
            codec.decode("user_13189a6ae4ab07ae70a3aabd30be99dg"),
            Err(Error::MalformedIdentifier { .. })
        ));

        // Too long.
        assert!(matches!(
            codec.decode("user_13189a6ae4ab07ae70a3aabd30be99de00"),
            Err(Error::MalformedIdentifier { .. })
        ));

        // Split happens at the first separator, so the hex part is too long here.
        assert!(matches!(
            codec.decode("us_er_13189a6ae4ab07ae70a3aabd30be99de"),
            Err(Error::MalformedIdentifier { .. })
        ));

        // Empty prefix is well-formed but never registered.
        assert_eq!(
            codec.decode("_13189a6ae4ab07ae70a3aabd30be99de"),
            Err(Error::UnknownPrefix {
                prefix: "".to_string()
            })
        );

        // Prefix lookup is case-sensitive.
        assert_eq!(
            codec.decode("User_13189a6ae4ab07ae70a3aabd30be99de"),
            Err(Error::UnknownPrefix {
                prefix: "User".to_string()
            })
        );
    }

    #[test]
    fn test_encode_unknown_prefix() {
        let codec = Codec::new(user_registry());
        assert_eq!(codec.store().prefixes(), vec!["user"]);
        assert_eq!(
            codec.encode("order", 1),
            Err(Error::UnknownPrefix {
                prefix: "order".to_string()
            })
        );
    }

    #[test]
    fn test_forged_identifier_decodes() {
        // There is no integrity tag, so any 32 hex digits decode to some id.
        let codec = Codec::new(user_registry());
        let (prefix, id) = codec
            .decode("user_00000000000000000000000000000000")
            .unwrap();
        assert_eq!(prefix, "user");
        assert_eq!(codec.encode("user", id).unwrap().len(), "user_".len() + HEX_LEN);
    }

    #[test]
    fn test_types_do_not_cross_decode() {
        let registry = user_registry();
        registry.register("order", &[9u8; 16]).unwrap();
        let codec = Codec::new(&registry);

        let user = codec.encode("user", 42).unwrap();
        let order = codec.encode("order", 42).unwrap();
        assert_ne!(user[5..], order[6..]);

        // Swapping the prefix decodes under the wrong key and yields another id.
        let swapped = format!("order_{}", &user[5..]);
        assert_ne!(codec.decode(&swapped).unwrap().1, 42);
    }

    #[test]
    fn test_distinct_outputs() {
        let codec = Codec::new(user_registry());
        let mut seen = HashSet::new();
        for id in -5_000..5_000 {
            assert!(seen.insert(codec.encode("user", id).unwrap()));
        }
    }

    #[test]
    fn test_format_and_parse() {
        let block = [0xabu8; BLOCK_LEN];
        let external_id = format_external_id("order", &block);
        assert_eq!(external_id, format!("order_{}", "ab".repeat(16)));
        assert_eq!(parse_external_id(&external_id).unwrap(), ("order", block));
    }

    #[test]
    fn test_random_roundtrips() {
        let codec = Codec::new(user_registry());
        let mut rng = rand::thread_rng();
        let range = Uniform::new_inclusive(i64::MIN, i64::MAX);

        for _ in 0..10_000 {
            let number = rng.sample(range);
            let encoded = codec.encode("user", number).unwrap();
            let (_, decoded) = codec.decode(&encoded).expect("Decoding failed");

            assert_eq!(decoded, number, "Failed at number: {}", number);
        }
    }
}
