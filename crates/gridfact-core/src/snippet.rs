//! Evidence snippets — the immutable source texts every citation points at.
//!
//! A snippet is created once per retrieval and never mutated for the
//! lifetime of the run. Its id is a content hash of (source, text), so the
//! same passage retrieved twice collapses to one id and citation sets stay
//! stable across retrieval order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ─── Id ──────────────────────────────────────────────────────────────────────

/// Content-hash identifier of a snippet; the only legal citation target.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SnippetId(pub String);

impl SnippetId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for SnippetId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Compute the snippet id for a (source, text) pair.
///
/// First 16 hex chars of SHA-256 over `source`, a 0x1E separator, and
/// `text`. Stable across runs and retrieval order.
pub fn snippet_id(source: &str, text: &str) -> SnippetId {
  let mut hasher = Sha256::new();
  hasher.update(source.as_bytes());
  hasher.update([0x1e]);
  hasher.update(text.as_bytes());
  let hash = hasher.finalize();
  SnippetId(hex::encode(hash)[..16].to_owned())
}

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Where a snippet came from and how it was retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
  /// Identifier of the originating document, if known.
  pub document_id: Option<String>,
  /// Human-readable source name, e.g. a filename or data-room path.
  pub source:      String,
  /// The retrieval query that surfaced this snippet.
  pub query:       String,
  /// Retriever-assigned relevance score, higher is better.
  pub relevance:   f64,
}

// ─── Snippet ─────────────────────────────────────────────────────────────────

/// An immutable evidence passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnippet {
  pub id:         SnippetId,
  pub text:       String,
  pub provenance: Provenance,
  /// Free-form retriever metadata (page numbers, section titles, ...).
  #[serde(default)]
  pub metadata:   BTreeMap<String, String>,
}

impl EvidenceSnippet {
  /// Build a snippet, deriving its id from (source, text).
  pub fn new(text: impl Into<String>, provenance: Provenance) -> Self {
    let text = text.into();
    let id = snippet_id(&provenance.source, &text);
    Self { id, text, provenance, metadata: BTreeMap::new() }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn prov(source: &str, query: &str) -> Provenance {
    Provenance {
      document_id: None,
      source:      source.into(),
      query:       query.into(),
      relevance:   0.5,
    }
  }

  #[test]
  fn same_source_and_text_same_id() {
    let a = EvidenceSnippet::new("Reserved 24 MW", prov("ia-memo.pdf", "q1"));
    let b = EvidenceSnippet::new("Reserved 24 MW", prov("ia-memo.pdf", "q2"));
    // Query does not participate in the id.
    assert_eq!(a.id, b.id);
  }

  #[test]
  fn different_source_different_id() {
    let a = EvidenceSnippet::new("Reserved 24 MW", prov("a.pdf", "q"));
    let b = EvidenceSnippet::new("Reserved 24 MW", prov("b.pdf", "q"));
    assert_ne!(a.id, b.id);
  }

  #[test]
  fn id_is_16_hex_chars() {
    let s = EvidenceSnippet::new("text", prov("doc", "q"));
    assert_eq!(s.id.as_str().len(), 16);
    assert!(s.id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
  }
}
