use serde::Deserialize;

use crate::{Error, Registry, SecretKey, Type};

/// Registry configuration, deserializable from any Serde format.
///
/// ```
/// use extid_rs::Config;
///
/// let config: Config = serde_json::from_str(r#"{
///     "types": [
///         {"prefix": "user", "secret_key": "000102030405060708090a0b0c0d0e0f"}
///     ]
/// }"#).unwrap();
///
/// let registry = config.build_registry().unwrap();
/// assert_eq!(registry.get("user").unwrap().encode(0), "user_c6a13b37878f5b826f4f8162a1c8d879");
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub types: Vec<TypeConfig>,
}

/// One identifier type. The key is given as 32 hex digits.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeConfig {
    pub prefix: String,
    pub secret_key: String,
}

impl std::fmt::Debug for TypeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TypeConfig")
            .field("prefix", &self.prefix)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl TypeConfig {
    pub fn build(&self) -> Result<Type, Error> {
        Type::with_key(&self.prefix, SecretKey::from_hex(&self.secret_key)?)
    }
}

impl Config {
    /// Builds a registry holding every configured type.
    ///
    /// Stops at the first invalid entry; duplicate prefixes are an error.
    pub fn build_registry(&self) -> Result<Registry, Error> {
        let registry = Registry::new();
        for type_config in &self.types {
            registry.insert(type_config.build()?)?;
        }
        Ok(registry)
    }
}
