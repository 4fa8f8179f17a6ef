use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a package.
///
/// Derived only from the identity fields (name, category, version), so every
/// `Package` value describing the same identity carries an equal fingerprint.
/// Fields are joined with `-`; a `-` or `%` inside a field is percent-encoded,
/// so distinct identities never share a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build the fingerprint for an identity
    pub fn new(name: &str, category: &str, version: &str) -> Self {
        Self(format!("{}-{}-{}", escape(name), escape(category), escape(version)))
    }

    /// Returns the fingerprint as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '%' => out.push_str("%25"),
            '-' => out.push_str("%2D"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
