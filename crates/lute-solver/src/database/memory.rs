use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;

use super::PackageDatabase;
use crate::error::{Result, SolverError};
use crate::package::{Fingerprint, Package};

/// Database kept entirely in memory.
///
/// Iteration follows insertion order. Packages are stored unflagged.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    packages: RwLock<IndexMap<Fingerprint, Package>>,
}

impl InMemoryDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a database holding the given packages
    pub fn from_packages<'p>(packages: impl IntoIterator<Item = &'p Package>) -> Result<Self> {
        let db = Self::new();
        for package in packages {
            db.create_package(package)?;
        }
        Ok(db)
    }

    /// Store a package, returning its fingerprint.
    ///
    /// Storing the same identity again is a no-op as long as the declarations
    /// match; a different declaration under an existing identity is rejected.
    pub fn create_package(&self, package: &Package) -> Result<Fingerprint> {
        let mut packages = self.packages.write().unwrap_or_else(PoisonError::into_inner);
        let fingerprint = package.fingerprint().clone();

        if let Some(existing) = packages.get(&fingerprint) {
            if !existing.has_same_declarations(package) {
                return Err(SolverError::MalformedInput(format!(
                    "{} is already stored with different requirements or conflicts",
                    package
                )));
            }
            return Ok(fingerprint);
        }

        log::trace!("Storing {} as {}", package, fingerprint);
        packages.insert(fingerprint.clone(), package.flagged(false));
        Ok(fingerprint)
    }

    /// Remove a package, returning it if it was stored
    pub fn remove_package(&self, fingerprint: &Fingerprint) -> Option<Package> {
        self.packages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(fingerprint)
    }

    /// Number of stored packages
    pub fn len(&self) -> usize {
        self.packages.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the database is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every package
    pub fn clear(&self) {
        self.packages.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl PackageDatabase for InMemoryDatabase {
    fn get_package(&self, fingerprint: &Fingerprint) -> Option<Package> {
        self.packages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fingerprint)
            .cloned()
    }

    fn get_packages(&self) -> Vec<Package> {
        self.packages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
