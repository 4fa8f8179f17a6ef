/// Integration tests for build plans
///
/// These tests go through the public API only: a database of packages with
/// categories and versions, a solve, then ordering, hashing and persistence
/// of the resulting plan.

use lute_solver::solver::PackageAssertions;
use lute_solver::{Fingerprint, InMemoryDatabase, Package, PackageDatabase, PackageRef, Solver};
use std::sync::Arc;
use std::thread;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A small source tree:
///
/// ```text
/// app-editors/vim -> sys-libs/ncurses -> sys-libs/glibc
/// net-misc/curl   -> sys-libs/zlib    -> sys-libs/glibc
/// net-misc/wget   -> sys-libs/zlib
/// ```
struct Tree {
    glibc: Package,
    zlib: Package,
    ncurses: Package,
    vim: Package,
    curl: Package,
    wget: Package,
}

impl Tree {
    fn new() -> Self {
        let glibc = Package::with_category("glibc", "sys-libs", "2.39");
        let zlib = Package::with_category("zlib", "sys-libs", "1.3").with_requires([glibc.to_ref()]);
        let ncurses = Package::with_category("ncurses", "sys-libs", "6.4").with_requires([glibc.to_ref()]);
        let vim = Package::with_category("vim", "app-editors", "9.1").with_requires([ncurses.to_ref()]);
        let curl = Package::with_category("curl", "net-misc", "8.5").with_requires([zlib.to_ref()]);
        let wget = Package::with_category("wget", "net-misc", "1.21").with_requires([zlib.to_ref()]);
        Self { glibc, zlib, ncurses, vim, curl, wget }
    }

    fn database(&self) -> InMemoryDatabase {
        InMemoryDatabase::from_packages([&self.glibc, &self.zlib, &self.ncurses, &self.vim, &self.curl, &self.wget])
            .unwrap()
    }
}

#[test]
fn test_database_lookups() {
    let tree = Tree::new();
    let db = tree.database();

    assert_eq!(db.len(), 6);
    assert_eq!(
        db.get_package(&Fingerprint::new("zlib", "sys-libs", "1.3")),
        Some(tree.zlib.clone())
    );
    assert_eq!(db.find_by_name("curl"), vec![tree.curl.clone()]);

    let revdeps: Vec<String> = db
        .revdeps(tree.zlib.fingerprint())
        .iter()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(revdeps, vec!["net-misc/curl-8.5", "net-misc/wget-1.21"]);
}

#[test]
fn test_solve_through_database() {
    init_logger();
    let tree = Tree::new();
    let db = tree.database();
    let solver = Solver::new(&[], &[], &db);

    let plan = solver.install(&[tree.curl.clone()]).unwrap();
    let ordered = plan.order(tree.curl.fingerprint());

    let fingerprints: Vec<&str> = ordered.iter().map(|a| a.fingerprint().as_str()).collect();
    assert_eq!(
        fingerprints,
        vec!["glibc-sys%2Dlibs-2.39", "zlib-sys%2Dlibs-1.3", "curl-net%2Dmisc-8.5"]
    );
}

#[test]
fn test_shared_base_gives_same_plan_identity() {
    init_logger();
    let tree = Tree::new();
    let db = tree.database();
    let solver = Solver::new(&[], &[], &db);

    let curl_base = solver
        .install(&[tree.curl.clone()])
        .unwrap()
        .order(tree.curl.fingerprint())
        .drop(&tree.curl);
    let wget_base = solver
        .install(&[tree.wget.clone()])
        .unwrap()
        .order(tree.wget.fingerprint())
        .drop(&tree.wget);
    let vim_base = solver
        .install(&[tree.vim.clone()])
        .unwrap()
        .order(tree.vim.fingerprint())
        .drop(&tree.vim);

    assert_eq!(curl_base.assertion_hash(), wget_base.assertion_hash());
    assert_ne!(curl_base.assertion_hash(), vim_base.assertion_hash());
}

#[test]
fn test_installed_packages_stay_in_plan() {
    let tree = Tree::new();
    let db = tree.database();
    let installed = vec![tree.vim.clone()];
    let solver = Solver::new(&installed, &[], &db);

    let plan = solver.install(&[tree.curl.clone()]).unwrap();

    assert_eq!(plan.len(), 5);
    assert!(plan.contains(&tree.vim, true));
    assert!(plan.contains(&tree.ncurses, true));
    assert!(plan.to_remove().next().is_none());
}

#[test]
fn test_plan_serialization() {
    let tree = Tree::new();
    let db = tree.database();
    let solver = Solver::new(&[], &[], &db);

    let ordered = solver.install(&[tree.curl.clone()]).unwrap().order(tree.curl.fingerprint());
    let json = serde_json::to_string(&ordered).unwrap();
    let restored: PackageAssertions = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, ordered);
    assert_eq!(restored.assertion_hash(), ordered.assertion_hash());
    assert!(restored.iter().all(|a| a.package.is_flagged()));
}

#[test]
fn test_unknown_reference_is_reported() {
    let openssl = PackageRef::new("openssl", "dev-libs", "3.2");
    let curl = Package::with_category("curl", "net-misc", "8.5").with_requires([openssl]);

    let db = InMemoryDatabase::new();
    let solver = Solver::new(&[], &[curl.clone()], &db);

    let err = solver.install(&[curl]).unwrap_err();
    assert!(err.to_string().contains("openssl-dev%2Dlibs-3.2"));
}

#[test]
fn test_concurrent_solves_share_database() {
    let tree = Tree::new();
    let db = Arc::new(tree.database());

    let handles: Vec<_> = [tree.curl.clone(), tree.wget.clone(), tree.vim.clone()]
        .into_iter()
        .map(|root| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                let solver = Solver::new(&[], &[], &*db);
                solver
                    .install(&[root.clone()])
                    .unwrap()
                    .order(root.fingerprint())
                    .assertion_hash()
            })
        })
        .collect();

    let hashes: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(hashes.len(), 3);
    assert_ne!(hashes[0], hashes[1]);
    assert_ne!(hashes[0], hashes[2]);
}
