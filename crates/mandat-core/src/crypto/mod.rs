//! Hashing primitives for the tamper-evident audit chain.
//!
//! Hashing here provides tamper-evidence and non-repudiation for the audit
//! ledger, not confidentiality. Key management is explicitly out of scope.

mod hash;

pub use hash::{canonicalize, derive_hash, ChainRoot, GENESIS_ROOT, SUBSTITUTION_ROOT};
