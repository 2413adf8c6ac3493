//! Injected-validator adapter.
//!
//! The core only knows how to collect values for a fixed list of required
//! key names; what counts as "valid" is the caller's business, supplied as a
//! [`SchemaValidator`] implementation. A missing key becomes an absent field
//! (`None`); every other resolver failure is a hard error.

use std::collections::BTreeMap;

use crate::core::resolver::SecretResolver;
use crate::error::{Error, Result};

/// Caller-supplied validation over collected secret values.
pub trait SchemaValidator {
    /// Judge the collected map; `None` marks a key the resolver could not
    /// find.
    fn validate(&self, values: &BTreeMap<String, Option<String>>) -> Result<()>;
}

impl<F> SchemaValidator for F
where
    F: Fn(&BTreeMap<String, Option<String>>) -> Result<()>,
{
    fn validate(&self, values: &BTreeMap<String, Option<String>>) -> Result<()> {
        self(values)
    }
}

/// Resolve each named key, mapping "not found" to `None`.
///
/// # Errors
///
/// Everything except `SecretNotFound` propagates: a decryption failure or a
/// dangling vault reference must not masquerade as an absent field.
pub fn collect(
    resolver: &SecretResolver,
    keys: &[&str],
) -> Result<BTreeMap<String, Option<String>>> {
    let mut values = BTreeMap::new();
    for &key in keys {
        match resolver.get(key) {
            Ok(value) => {
                values.insert(key.to_string(), Some(value));
            }
            Err(Error::SecretNotFound(_)) => {
                values.insert(key.to_string(), None);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(values)
}

/// Collect `keys` and feed them to `validator`.
pub fn check(
    resolver: &SecretResolver,
    keys: &[&str],
    validator: &dyn SchemaValidator,
) -> Result<()> {
    let values = collect(resolver, keys)?;
    validator.validate(&values)
}
