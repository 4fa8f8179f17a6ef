use serde::{Deserialize, Serialize};
use std::fmt;

use super::fingerprint::Fingerprint;

/// Reference to another package identity.
///
/// Dependency and conflict lists hold these instead of package copies; the
/// solver resolves them against the universe and the database at solve time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    /// Identity of the referenced package
    pub fingerprint: Fingerprint,
    /// Package name, kept for error messages
    pub name: String,
}

impl PackageRef {
    /// Creates a reference to the given identity
    pub fn new(name: impl Into<String>, category: &str, version: &str) -> Self {
        let name = name.into();
        Self {
            fingerprint: Fingerprint::new(&name, category, version),
            name,
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&Package> for PackageRef {
    fn from(package: &Package) -> Self {
        package.to_ref()
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.fingerprint)
    }
}

/// A package variant known to the resolver.
///
/// Everything except the selection flag is fixed at construction. The flag
/// separates the "wanted" variant of an identity from the "not wanted" one;
/// [`Package::flagged`] mints a new value rather than mutating in place.
///
/// Equality covers the flag, so the two variants of one identity are distinct
/// map keys. Use [`Package::fingerprint`] to compare identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PackageSpec", into = "PackageSpec")]
pub struct Package {
    name: String,
    category: String,
    version: String,
    requires: Vec<PackageRef>,
    conflicts: Vec<PackageRef>,
    flagged: bool,
    fingerprint: Fingerprint,
}

/// Serialized form of a package; the fingerprint is always re-derived
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PackageSpec {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    requires: Vec<PackageRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conflicts: Vec<PackageRef>,
    #[serde(default)]
    flagged: bool,
}

impl From<PackageSpec> for Package {
    fn from(spec: PackageSpec) -> Self {
        Package::with_category(spec.name, spec.category, spec.version)
            .with_requires(spec.requires)
            .with_conflicts(spec.conflicts)
            .flagged(spec.flagged)
    }
}

impl From<Package> for PackageSpec {
    fn from(package: Package) -> Self {
        Self {
            name: package.name,
            category: package.category,
            version: package.version,
            requires: package.requires,
            conflicts: package.conflicts,
            flagged: package.flagged,
        }
    }
}

impl Package {
    /// Create a package with no category, requiring and conflicting with the
    /// given packages.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        requires: &[&Package],
        conflicts: &[&Package],
    ) -> Self {
        Self::with_category(name, "", version)
            .with_requires(requires.iter().map(|p| p.to_ref()))
            .with_conflicts(conflicts.iter().map(|p| p.to_ref()))
    }

    /// Create a package without relationships
    pub fn with_category(
        name: impl Into<String>,
        category: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let category = category.into();
        let version = version.into();
        let fingerprint = Fingerprint::new(&name, &category, &version);

        Self {
            name,
            category,
            version,
            requires: Vec::new(),
            conflicts: Vec::new(),
            flagged: false,
            fingerprint,
        }
    }

    /// Append requirements, skipping references that are already declared
    pub fn with_requires(mut self, requires: impl IntoIterator<Item = PackageRef>) -> Self {
        for dep in requires {
            if !self.requires.iter().any(|r| r.fingerprint == dep.fingerprint) {
                self.requires.push(dep);
            }
        }
        self
    }

    /// Append conflicts, skipping references that are already declared
    pub fn with_conflicts(mut self, conflicts: impl IntoIterator<Item = PackageRef>) -> Self {
        for conflict in conflicts {
            if !self.conflicts.iter().any(|c| c.fingerprint == conflict.fingerprint) {
                self.conflicts.push(conflict);
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Direct requirements, in declaration order
    pub fn requires(&self) -> &[PackageRef] {
        &self.requires
    }

    /// Declared conflicts, in declaration order
    pub fn conflicts(&self) -> &[PackageRef] {
        &self.conflicts
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged
    }

    /// Returns the variant of this identity with the selection flag set to `flag`
    pub fn flagged(&self, flag: bool) -> Package {
        let mut variant = self.clone();
        variant.flagged = flag;
        variant
    }

    /// Returns a reference to this package's identity
    pub fn to_ref(&self) -> PackageRef {
        PackageRef {
            fingerprint: self.fingerprint.clone(),
            name: self.name.clone(),
        }
    }

    /// Whether this package directly requires the given identity
    pub fn requires_identity(&self, fingerprint: &Fingerprint) -> bool {
        self.requires.iter().any(|r| &r.fingerprint == fingerprint)
    }

    /// Whether either package declares a conflict with the other
    pub fn conflicts_with(&self, other: &Package) -> bool {
        if self.fingerprint == other.fingerprint {
            return false;
        }
        self.conflicts.iter().any(|c| c.fingerprint == other.fingerprint)
            || other.conflicts.iter().any(|c| c.fingerprint == self.fingerprint)
    }

    /// Whether two values declare the same relationships, ignoring order and flag
    pub fn has_same_declarations(&self, other: &Package) -> bool {
        fn sorted(refs: &[PackageRef]) -> Vec<&Fingerprint> {
            let mut fingerprints: Vec<_> = refs.iter().map(|r| &r.fingerprint).collect();
            fingerprints.sort();
            fingerprints
        }

        self.fingerprint == other.fingerprint
            && sorted(&self.requires) == sorted(&other.requires)
            && sorted(&self.conflicts) == sorted(&other.conflicts)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.category.is_empty() {
            write!(f, "{}/", self.category)?;
        }
        f.write_str(&self.name)?;
        if !self.version.is_empty() {
            write!(f, "-{}", self.version)?;
        }
        Ok(())
    }
}
