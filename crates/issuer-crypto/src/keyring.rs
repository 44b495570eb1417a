//! # Key Ring
//!
//! Maps signing-key aliases (as referenced by credential definitions and
//! the engine's default alias) to Ed25519 keys. Keys are held behind `Arc`
//! because `SigningKey` is deliberately not `Clone`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ed25519::{SigningKey, VerifyingKey};
use crate::error::CryptoError;

/// Alias-keyed collection of signing keys.
#[derive(Default)]
pub struct KeyRing {
    keys: BTreeMap<String, Arc<SigningKey>>,
}

impl KeyRing {
    /// Create an empty key ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Replaces any existing key under `alias`.
    pub fn with_key(mut self, alias: impl Into<String>, key: SigningKey) -> Self {
        self.keys.insert(alias.into(), Arc::new(key));
        self
    }

    /// Register a key under a new alias.
    ///
    /// Rejects empty aliases and aliases that are already taken: silently
    /// replacing a key would change the issuer identity behind credentials
    /// that reference the alias.
    pub fn insert(&mut self, alias: impl Into<String>, key: SigningKey) -> Result<(), CryptoError> {
        let alias = alias.into();
        if alias.trim().is_empty() {
            return Err(CryptoError::KeyError("key alias must not be empty".into()));
        }
        if self.keys.contains_key(&alias) {
            return Err(CryptoError::KeyError(format!(
                "key alias {alias:?} is already registered"
            )));
        }
        self.keys.insert(alias, Arc::new(key));
        Ok(())
    }

    /// Look up a signing key by alias.
    pub fn get(&self, alias: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(alias).cloned()
    }

    /// Public key for an alias.
    pub fn verifying_key(&self, alias: &str) -> Option<VerifyingKey> {
        self.keys.get(alias).map(|k| k.verifying_key())
    }

    /// All public keys, ordered by alias.
    pub fn public_keys(&self) -> BTreeMap<String, VerifyingKey> {
        self.keys
            .iter()
            .map(|(alias, key)| (alias.clone(), key.verifying_key()))
            .collect()
    }

    /// Registered aliases in order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Whether an alias is registered.
    pub fn contains(&self, alias: &str) -> bool {
        self.keys.contains_key(alias)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the ring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("aliases", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}
