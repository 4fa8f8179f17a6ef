// Package model for the resolver
//
// A package is an identity (name, category, version) plus the identities it
// requires and conflicts with. Relationships are stored as references to other
// identities, never as nested copies, so shared dependencies form a DAG.

mod fingerprint;
mod package;

pub use fingerprint::Fingerprint;
pub use package::{Package, PackageRef};
