//! `extid` turns internal 64-bit integer IDs into opaque external identifiers and
//! back, using a secret key per identifier type.
//!
//! This library is designed for exposing sequential database IDs in public APIs
//! without revealing their order, magnitude or the number of records. An external
//! identifier looks like `user_13189a6ae4ab07ae70a3aabd30be99de`: the type prefix,
//! an underscore, and 32 lowercase hex digits.
//!
//! Each identifier type has its own prefix and its own 16-byte key, so IDs of
//! different types can't be mixed up or decoded with the wrong key.
//!
//! # Format
//!
//! The id is written as 8 big-endian bytes followed by 8 zero bytes, and the
//! resulting block is encrypted with AES-128 using the type's key verbatim. The
//! ciphertext is hex encoded in lowercase. Encoding is deterministic, so any
//! implementation holding the same key produces the same string. The
//! `encode_extid` and `decode_extid` functions in `sql/extid.sql` do the same
//! inside Postgres.
//!
//! There is no integrity tag. Decoding a well-formed but made-up identifier
//! succeeds and returns some integer, so decoded IDs must still be looked up and
//! access-checked like any other input.
//!
//! Leaking a key means anyone can decode and forge identifiers of that type.
//! Changing a key changes every identifier issued under it.
//!
//! # Usage
//!
//! ## Types and the registry
//!
//! ```
//! use extid_rs::{Codec, Registry};
//!
//! let registry = Registry::new();
//! registry.register("user", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]).unwrap();
//!
//! let codec = Codec::new(&registry);
//! let encoded = codec.encode("user", 0).unwrap();
//! assert_eq!(encoded, "user_c6a13b37878f5b826f4f8162a1c8d879");
//! assert_eq!(codec.decode(&encoded).unwrap(), ("user".to_string(), 0));
//! ```
//!
//! A single [`Type`] can also be used directly, without a registry:
//!
//! ```
//! use extid_rs::Type;
//!
//! let user = Type::new("user", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]).unwrap();
//! assert_eq!(user.encode(-1), "user_25d4e948bd5e1296afc0bf87095a7248");
//! assert_eq!(user.decode("user_25d4e948bd5e1296afc0bf87095a7248").unwrap(), -1);
//! ```
//!
//! ## Generic `Field` API
//!
//! `Field<T>` wraps an `i64` and encodes itself through the global [`Registry`]
//! when serialized with Serde. It maps to a Postgres `BigInt` with Diesel.
//!
//! ```
//! #[derive(Debug, Clone, Copy)]
//! pub struct OrderIdMarker;
//! impl extid_rs::TypeMarker for OrderIdMarker {
//!     fn prefix() -> &'static str { "order" }
//! }
//!
//! type OrderId = extid_rs::Field<OrderIdMarker>;
//!
//! let registry = extid_rs::Registry::new();
//! registry.register("order", &[7u8; 16]).unwrap();
//! extid_rs::Registry::set_global(registry);
//!
//! let encoded = serde_json::to_string(&OrderId::from(12345)).unwrap();
//! let decoded: OrderId = serde_json::from_str(&encoded).unwrap();
//! assert_eq!(i64::from(decoded), 12345);
//! ```

mod codec;
mod config;
mod error;
mod extid_type;
mod field;
mod key;
mod pg;
mod registry;

pub use codec::{
    format_external_id, parse_external_id, Codec, BLOCK_LEN, HEX_LEN, LAYOUT_VERSION, SEPARATOR,
};
pub use config::{Config, TypeConfig};
pub use error::Error;
pub use extid_type::Type;
pub use field::{Field, TypeMarker};
pub use key::{SecretKey, KEY_LEN};
pub use pg::PgKeyStore;
pub use registry::{KeyStore, Registry};
