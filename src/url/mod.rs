//! URL handling module for Tidepool
//!
//! This module provides URL canonicalization, host extraction, and
//! allowed-domain scope matching. Canonical URLs are the identity keys the
//! frontier, visited index, and manifests are all keyed by.

mod canonical;
mod scope;

pub use canonical::{canonicalize, domain_of};
pub use scope::ScopeList;
