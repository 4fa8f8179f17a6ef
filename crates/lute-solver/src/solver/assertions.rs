use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::package::{Fingerprint, Package};

/// A claim that an identity must (`value == true`) or must not be installed.
///
/// The package is the variant flagged with `value`; `value` is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageAssert {
    pub package: Package,
    pub value: bool,
}

impl PackageAssert {
    pub fn new(package: &Package, value: bool) -> Self {
        Self {
            package: package.flagged(value),
            value,
        }
    }

    /// A "must not be installed" assertion that still carries the flagged
    /// package, as emitted for dependents of a solution.
    pub fn kept_out(package: &Package) -> Self {
        Self {
            package: package.flagged(true),
            value: false,
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        self.package.fingerprint()
    }

    /// The assertion key: identity plus desired state
    pub fn key(&self) -> (Fingerprint, bool) {
        (self.package.fingerprint().clone(), self.value)
    }
}

impl fmt::Display for PackageAssert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.value { '+' } else { '-' };
        write!(f, "{}{}", sign, self.package)
    }
}

/// An ordered plan: at most one assertion per identity.
///
/// `order` and `drop` return new plans and leave the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageAssertions(Vec<PackageAssert>);

/// Deserialized entries go through [`FromIterator`], so a repeated identity
/// keeps its first assertion.
impl<'de> Deserialize<'de> for PackageAssertions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<PackageAssert>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl PackageAssertions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageAssert> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[PackageAssert] {
        &self.0
    }

    /// Find the assertion for an identity
    pub fn search(&self, fingerprint: &Fingerprint) -> Option<&PackageAssert> {
        self.0.iter().find(|a| a.fingerprint() == fingerprint)
    }

    /// Whether the plan asserts `value` for the package's identity
    pub fn contains(&self, package: &Package, value: bool) -> bool {
        self.search(package.fingerprint())
            .is_some_and(|a| a.value == value)
    }

    /// Packages asserted to be installed, in plan order
    pub fn to_install(&self) -> impl Iterator<Item = &Package> {
        self.0.iter().filter(|a| a.value).map(|a| &a.package)
    }

    /// Packages asserted to stay out, in plan order
    pub fn to_remove(&self) -> impl Iterator<Item = &Package> {
        self.0.iter().filter(|a| !a.value).map(|a| &a.package)
    }

    /// A copy of the plan without the package's identity
    pub fn drop(&self, package: &Package) -> PackageAssertions {
        self.0
            .iter()
            .filter(|a| a.fingerprint() != package.fingerprint())
            .cloned()
            .collect()
    }

    /// Reorder so every entry comes after the entries it depends on.
    ///
    /// Post-order walk from `root` following `requires` in declared order,
    /// restricted to identities in the plan. Entries the root does not reach
    /// are walked afterwards, started in ascending fingerprint order. A node is
    /// marked on entry, so cyclic data cannot loop.
    pub fn order(&self, root: &Fingerprint) -> PackageAssertions {
        let index: HashMap<&Fingerprint, usize> = self
            .0
            .iter()
            .enumerate()
            .map(|(i, a)| (a.fingerprint(), i))
            .collect();

        let mut visited = vec![false; self.0.len()];
        let mut ordered = Vec::with_capacity(self.0.len());

        if let Some(&start) = index.get(root) {
            self.visit(start, &index, &mut visited, &mut ordered);
        }

        let mut rest: Vec<usize> = (0..self.0.len()).filter(|&i| !visited[i]).collect();
        rest.sort_by(|&a, &b| self.0[a].fingerprint().cmp(self.0[b].fingerprint()));
        for start in rest {
            if !visited[start] {
                self.visit(start, &index, &mut visited, &mut ordered);
            }
        }

        ordered.into_iter().map(|i| self.0[i].clone()).collect()
    }

    fn visit(&self, start: usize, index: &HashMap<&Fingerprint, usize>, visited: &mut [bool], ordered: &mut Vec<usize>) {
        // (entry, next dependency to look at)
        let mut stack = vec![(start, 0usize)];
        visited[start] = true;

        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            top.1 += 1;

            match self.0[node].package.requires().get(cursor) {
                Some(dependency) => {
                    if let Some(&next) = index.get(dependency.fingerprint()) {
                        if !visited[next] {
                            visited[next] = true;
                            stack.push((next, 0));
                        }
                    }
                }
                None => {
                    ordered.push(node);
                    stack.pop();
                }
            }
        }
    }

    /// Canonical identity of the plan: lowercase hex SHA-256 over one
    /// `"{len}:{fingerprint}:{value}\n"` line per entry, in plan order, where
    /// `len` is the fingerprint's byte length
    pub fn assertion_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for assert in &self.0 {
            let fingerprint = assert.fingerprint().as_str();
            hasher.update(format!("{}:", fingerprint.len()).as_bytes());
            hasher.update(fingerprint.as_bytes());
            hasher.update(if assert.value { b":true\n".as_slice() } else { b":false\n".as_slice() });
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Collects assertions, keeping the first one seen for each identity
impl FromIterator<PackageAssert> for PackageAssertions {
    fn from_iter<I: IntoIterator<Item = PackageAssert>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        Self(
            iter.into_iter()
                .filter(|a| seen.insert(a.fingerprint().clone()))
                .collect(),
        )
    }
}

impl Index<usize> for PackageAssertions {
    type Output = PackageAssert;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IntoIterator for PackageAssertions {
    type Item = PackageAssert;
    type IntoIter = std::vec::IntoIter<PackageAssert>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PackageAssertions {
    type Item = &'a PackageAssert;
    type IntoIter = std::slice::Iter<'a, PackageAssert>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PackageAssertions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self.0.iter().map(|a| a.to_string()).collect();
        write!(f, "[{}]", entries.join(", "))
    }
}
