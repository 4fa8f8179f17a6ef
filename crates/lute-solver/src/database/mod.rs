//! Package lookup used by the solver to resolve identity references.
//!
//! The solver never loads metadata on its own; it asks a [`PackageDatabase`]
//! for the concrete package behind a [`Fingerprint`]. Storage backends live
//! outside this crate and only need to implement the two required methods.

mod memory;

pub use memory::InMemoryDatabase;

use crate::package::{Fingerprint, Package};

/// Read-only package lookup.
///
/// Implementations must not change while a solve that borrows them is running.
pub trait PackageDatabase: Send + Sync {
    /// Resolve an identity to its package, `None` when unknown
    fn get_package(&self, fingerprint: &Fingerprint) -> Option<Package>;

    /// All known packages
    fn get_packages(&self) -> Vec<Package>;

    /// All packages with the given name, across categories and versions
    fn find_by_name(&self, name: &str) -> Vec<Package> {
        self.get_packages()
            .into_iter()
            .filter(|p| p.name() == name)
            .collect()
    }

    /// Packages that directly require the given identity
    fn revdeps(&self, fingerprint: &Fingerprint) -> Vec<Package> {
        self.get_packages()
            .into_iter()
            .filter(|p| p.requires_identity(fingerprint))
            .collect()
    }
}
