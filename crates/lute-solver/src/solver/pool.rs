use indexmap::IndexMap;

use crate::package::{Fingerprint, Package};

/// A literal represents a package decision in the SAT solver.
/// Positive literals mean "install package", negative means "don't install".
pub type PackageId = i32;

/// Registry of the identities taking part in one solve.
///
/// Each identity gets a 1-based id in discovery order; the id is the SAT
/// variable, and its sign in a literal is the desired state.
#[derive(Debug, Default)]
pub struct Pool {
    /// Packages indexed by ID - 1
    packages: Vec<Package>,

    /// Fingerprint -> ID
    ids: IndexMap<Fingerprint, PackageId>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package, returning its id. An identity already present keeps its
    /// first id and declaration.
    pub fn add(&mut self, package: &Package) -> PackageId {
        if let Some(&id) = self.ids.get(package.fingerprint()) {
            return id;
        }

        self.packages.push(package.flagged(false));
        let id = self.packages.len() as PackageId;
        self.ids.insert(package.fingerprint().clone(), id);
        id
    }

    /// Look up the id of an identity
    pub fn id_of(&self, fingerprint: &Fingerprint) -> Option<PackageId> {
        self.ids.get(fingerprint).copied()
    }

    /// Get a package by id
    pub fn package(&self, id: PackageId) -> Option<&Package> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.packages.get(index)
    }

    /// All ids, in discovery order
    pub fn ids(&self) -> impl Iterator<Item = PackageId> {
        1..=self.packages.len() as PackageId
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Human-readable name for a package id
    pub fn describe(&self, id: PackageId) -> String {
        self.package(id)
            .map(|p| p.to_string())
            .unwrap_or_else(|| format!("#{}", id))
    }

    /// Human-readable form of a literal: "+name" installs, "-name" does not
    pub fn literal_to_string(&self, literal: i32) -> String {
        let sign = if literal > 0 { '+' } else { '-' };
        format!("{}{}", sign, self.describe(literal.abs()))
    }
}
