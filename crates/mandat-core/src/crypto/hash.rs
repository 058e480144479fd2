//! Blake3 hash-chain derivation over canonical JSON payloads.
//!
//! Each audit event's hash is computed as
//! `blake3(previous ‖ canonicalize(payload))`, where `previous` is either
//! the hex hash of the prior event or the literal root sentinel for the
//! first event of a chain. Canonicalization sorts object keys recursively
//! so that semantically equal payloads always hash identically.

use std::fmt::Write as _;

use serde_json::Value;

/// Root sentinel for the primary per-aggregate chain.
pub const GENESIS_ROOT: &str = "genesis";

/// Root sentinel for the independent substitution evidentiary chain.
///
/// Substitution resolutions carry legal weight separate from the
/// operational trail, so their hashes are rooted independently and never
/// feed back into the primary chain.
pub const SUBSTITUTION_ROOT: &str = "substitution";

/// The two chain roots recognized by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainRoot {
    /// Primary operational chain (`"genesis"`).
    Genesis,
    /// Substitution evidentiary chain (`"substitution"`).
    Substitution,
}

impl ChainRoot {
    /// Returns the literal sentinel used as the first `previous` value.
    #[must_use]
    pub const fn sentinel(&self) -> &'static str {
        match self {
            Self::Genesis => GENESIS_ROOT,
            Self::Substitution => SUBSTITUTION_ROOT,
        }
    }
}

/// Encodes a JSON value canonically: object keys sorted lexicographically
/// at every nesting level, no insignificant whitespace.
///
/// Array order is preserved; only object key order is normalized.
#[must_use]
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => {
            // serde_json's string Display applies JSON escaping.
            let _ = write!(out, "{}", Value::String(s.clone()));
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", Value::String((*key).clone()));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// Derives the next chain hash from the previous link and a payload.
///
/// `previous` is the hex hash of the prior event, or a root sentinel
/// ([`GENESIS_ROOT`] / [`SUBSTITUTION_ROOT`]) for the first link. The
/// result is a lowercase hex blake3 digest.
#[must_use]
pub fn derive_hash(previous: &str, payload: &Value) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(previous.as_bytes());
    hasher.update(canonicalize(payload).as_bytes());
    hasher.finalize().to_hex().to_string()
}
