use crate::types::{NodeKind, Span};
use sha2::{Digest, Sha256};

/// Truncated hex length for all IDs. 128 bits of SHA-256 keeps IDs short
/// while leaving collisions out of practical reach.
const ID_HEX_LEN: usize = 32;

/// Stable repository identifier: hash of the canonical repository name
/// (e.g. "org/repo").
#[must_use]
pub fn repo_id(repo_full_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_full_name.as_bytes());
    truncated_hex(&hasher.finalize())
}

/// Stable node identifier: hash of the canonical
/// `(repo_id, path, kind, name, loc)` tuple.
///
/// The tuple parts are NUL-joined so no field boundary can be forged by
/// crafted names; the span canonicalization is byte-stable. Re-indexing
/// unchanged source must reproduce identical IDs.
#[must_use]
pub fn node_id(
    repo_id: &str,
    path: &str,
    kind: NodeKind,
    name: &str,
    span: Option<&Span>,
) -> String {
    let loc = span.map_or_else(|| "-".to_string(), Span::canonical);

    let mut hasher = Sha256::new();
    for (idx, part) in [repo_id, path, kind.as_str(), name, loc.as_str()]
        .into_iter()
        .enumerate()
    {
        if idx > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    truncated_hex(&hasher.finalize())
}

fn truncated_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(ID_HEX_LEN);
    for byte in digest.iter().take(ID_HEX_LEN / 2) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
