//! Request fingerprinting: turns an endpoint and its query parameters into a
//! stable cache key.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::form_urlencoded::byte_serialize;

/// How a canonical request key is condensed into the key stored in the cache.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyDigest {
  /// SHA256 hex digest, fixed length
  #[default]
  Sha256,
  /// Unsafe characters replaced with `_`. Weaker: distinct keys can collide.
  Sanitized,
}

/// Build the canonical form of a request.
///
/// Parameters without a value are dropped and the rest are sorted by name, so
/// the same parameter set always yields the same key whatever order it was
/// supplied in. Names and values are form-encoded, so a value containing `&`
/// or `=` cannot impersonate extra parameters.
pub fn canonical_key<I, K, V>(endpoint: &str, params: I) -> String
where
  I: IntoIterator<Item = (K, Option<V>)>,
  K: AsRef<str>,
  V: AsRef<str>,
{
  let mut pairs: Vec<(String, String)> = params
    .into_iter()
    .filter_map(|(name, value)| {
      value.map(|v| (encode(name.as_ref()), encode(v.as_ref())))
    })
    .collect();

  if pairs.is_empty() {
    return endpoint.to_string();
  }

  // Sorting on the value as well keeps repeated names deterministic
  pairs.sort();

  let query = pairs
    .iter()
    .map(|(name, value)| format!("{}={}", name, value))
    .collect::<Vec<_>>()
    .join("&");

  format!("{}?{}", endpoint, query)
}

fn encode(raw: &str) -> String {
  byte_serialize(raw.as_bytes()).collect()
}

/// Condense a canonical key with the given digest.
pub fn hash(canonical: &str, digest: KeyDigest) -> String {
  match digest {
    KeyDigest::Sha256 => {
      let mut hasher = Sha256::new();
      hasher.update(canonical.as_bytes());
      hex::encode(hasher.finalize())
    }
    KeyDigest::Sanitized => sanitize(canonical),
  }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize(input: &str) -> String {
  input
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
        c
      } else {
        '_'
      }
    })
    .collect()
}
