use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::{Error, SecretKey, Type};

static GLOBAL_REGISTRY: Lazy<RwLock<Option<Arc<Registry>>>> = Lazy::new(|| RwLock::new(None));

/// Resolves a prefix to the key of the type registered under it.
///
/// Lookups are exact: case-sensitive, no trimming or normalization.
pub trait KeyStore: Send + Sync {
    /// Looks up the secret key for `prefix`.
    ///
    /// Fails with [`Error::UnknownPrefix`] if nothing is registered under it.
    fn resolve(&self, prefix: &str) -> Result<SecretKey, Error>;

    /// Looks up `prefix` and returns a ready-to-use [`Type`].
    fn resolve_type(&self, prefix: &str) -> Result<Type, Error> {
        let secret_key = self.resolve(prefix)?;
        Type::with_key(prefix, secret_key)
    }
}

impl<S: KeyStore + ?Sized> KeyStore for &S {
    fn resolve(&self, prefix: &str) -> Result<SecretKey, Error> {
        (**self).resolve(prefix)
    }

    fn resolve_type(&self, prefix: &str) -> Result<Type, Error> {
        (**self).resolve_type(prefix)
    }
}

impl<S: KeyStore + ?Sized> KeyStore for Arc<S> {
    fn resolve(&self, prefix: &str) -> Result<SecretKey, Error> {
        (**self).resolve(prefix)
    }

    fn resolve_type(&self, prefix: &str) -> Result<Type, Error> {
        (**self).resolve_type(prefix)
    }
}

/// In-memory registry of identifier types.
///
/// Any number of readers may resolve in parallel; `register` and `remove`
/// take the write lock. Each prefix can be registered only once.
///
/// # Examples
///
/// ```
/// use extid_rs::{KeyStore, Registry};
///
/// let registry = Registry::new();
/// registry.register("order", &[42u8; 16]).unwrap();
///
/// assert!(registry.resolve("order").is_ok());
/// assert!(registry.resolve("Order").unwrap_err().is_not_found());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    types: RwLock<HashMap<String, Type>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Validates `prefix` and `secret_key`, and registers the resulting type.
    pub fn register(&self, prefix: &str, secret_key: &[u8]) -> Result<Type, Error> {
        let extid_type = Type::new(prefix, secret_key)?;
        self.insert(extid_type.clone())?;
        Ok(extid_type)
    }

    /// Registers an already constructed type.
    pub fn insert(&self, extid_type: Type) -> Result<(), Error> {
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        if types.contains_key(extid_type.prefix()) {
            return Err(Error::DuplicatePrefix {
                prefix: extid_type.prefix().to_string(),
            });
        }
        tracing::debug!(prefix = extid_type.prefix(), "registered extid type");
        types.insert(extid_type.prefix().to_string(), extid_type);
        Ok(())
    }

    /// Removes a type. Identifiers issued under it can no longer be decoded.
    pub fn remove(&self, prefix: &str) -> Option<Type> {
        let removed = self
            .types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(prefix);
        if removed.is_some() {
            tracing::debug!(prefix, "removed extid type");
        }
        removed
    }

    /// Returns the type registered under `prefix`.
    pub fn get(&self, prefix: &str) -> Result<Type, Error> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        match types.get(prefix) {
            Some(extid_type) => Ok(extid_type.clone()),
            None => {
                tracing::trace!(prefix, "unknown extid prefix");
                Err(Error::UnknownPrefix {
                    prefix: prefix.to_string(),
                })
            }
        }
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(prefix)
    }

    /// Returns the registered prefixes in sorted order.
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        prefixes.sort();
        prefixes
    }

    pub fn len(&self) -> usize {
        self.types.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets the global registry. This should be called before the `Field` type
    /// methods are called. Calling it again replaces the previous registry.
    pub fn set_global(registry: Registry) -> Arc<Registry> {
        let registry = Arc::new(registry);
        tracing::debug!(types = registry.len(), "installed global extid registry");
        *GLOBAL_REGISTRY
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(registry.clone());
        registry
    }

    /// Accesses the global registry, if set.
    pub fn global() -> Option<Arc<Registry>> {
        GLOBAL_REGISTRY
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl KeyStore for Registry {
    fn resolve(&self, prefix: &str) -> Result<SecretKey, Error> {
        self.get(prefix)
            .map(|extid_type| extid_type.secret_key().clone())
    }

    fn resolve_type(&self, prefix: &str) -> Result<Type, Error> {
        self.get(prefix)
    }
}
