//! Flat TOML configuration tables.
//!
//! Models are configured once, at construction, from a flat mapping of
//! named parameters. Parameter structs declare `deny_unknown_fields`, so an
//! unrecognized key fails loading instead of being silently ignored, and
//! regime selectors (damage-function variant, welfare objective) are
//! required fields, so they can never default silently.

use crate::errors::{SiamError, SiamResult};
use serde::de::DeserializeOwned;

/// Deserialize a parameter struct from a TOML source string.
///
/// Parse and validation failures (unknown keys, missing required keys,
/// out-of-set enum variants) surface as [`SiamError::Configuration`] with
/// the underlying message, which names the offending key or value and, for
/// enums, the accepted set.
pub fn from_toml_str<T: DeserializeOwned>(source: &str) -> SiamResult<T> {
    toml::from_str(source).map_err(|e| SiamError::Configuration(e.to_string()))
}
