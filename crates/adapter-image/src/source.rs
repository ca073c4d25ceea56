//! Source image locators.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a source image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageSource {
    /// Object in the deployment's content store, keyed by site path.
    Local { key: String },
    /// Absolute `http(s)` URL on an allowed remote host.
    Remote { url: String },
}

impl ImageSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { key } => write!(f, "local:{}", key),
            Self::Remote { url } => write!(f, "remote:{}", url),
        }
    }
}

/// Join a store key prefix and a site path into an object key.
///
/// All leading and trailing `/` are trimmed from the prefix and all leading
/// `/` from the key, so the two are joined by exactly one `/`. An empty
/// prefix leaves the key as is.
pub fn join_key(prefix: Option<&str>, key: &str) -> String {
    let key = key.trim_start_matches('/');
    let prefix = prefix.unwrap_or("").trim_matches('/');

    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key)
    }
}
