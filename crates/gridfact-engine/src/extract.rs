//! The evidence extractor — turns snippets plus the fact catalog into
//! citation-validated [`FactValue`]s via an injected extraction capability.
//!
//! The capability (in production, a generative model invoked at zero
//! temperature) is constrained to cite only the supplied snippet ids. This
//! module enforces that constraint rather than trusting it: unknown
//! citation ids are stripped, and a non-null value whose citations empty
//! out is replaced with the canonical empty value. An uncited value never
//! survives. Extractor unavailability degrades to all-empty facts.

use std::{collections::BTreeMap, future::Future};

use gridfact_core::{
  catalog::{ArtifactKind, FactCatalog, ValueKind},
  fact::{EvidenceTier, FactValue, Value},
  snippet::{EvidenceSnippet, SnippetId},
};
use tracing::warn;

// ─── Capability interface ────────────────────────────────────────────────────

/// One candidate reading for a fact code, as produced by the capability.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCandidate {
  pub value:     Option<Value>,
  pub citations: Vec<SnippetId>,
  pub tier:      EvidenceTier,
  pub artifacts: Vec<ArtifactKind>,
}

/// The evidence-extraction collaborator: a pure function from (snippets,
/// catalog) to one candidate per fact code, injected into the pipeline so
/// tests can run against deterministic stubs.
pub trait FactExtractor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn extract(
    &self,
    snippets: &[EvidenceSnippet],
    catalog: &FactCatalog,
  ) -> impl Future<Output = Result<BTreeMap<String, ExtractedCandidate>, Self::Error>>
  + Send;
}

/// Extractor that promotes the pattern pass's first candidate per code into
/// a fact value. Used by the CLI and the API server when no model-backed
/// extractor is wired in. Evidence tier is capped at `SellerStatement`:
/// a regex sweep cannot classify the document it matched in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternBootstrapExtractor;

impl FactExtractor for PatternBootstrapExtractor {
  type Error = std::convert::Infallible;

  async fn extract(
    &self,
    snippets: &[EvidenceSnippet],
    catalog: &FactCatalog,
  ) -> Result<BTreeMap<String, ExtractedCandidate>, Self::Error> {
    let mut out = BTreeMap::new();
    for (code, candidates) in crate::patterns::pattern_candidates(snippets) {
      if !catalog.contains(&code) {
        continue;
      }
      let Some(first) = candidates.first() else {
        continue;
      };
      out.insert(code, ExtractedCandidate {
        value:     Some(first.value.clone()),
        citations: vec![first.citation.clone()],
        tier:      EvidenceTier::SellerStatement,
        artifacts: Vec::new(),
      });
    }
    Ok(out)
  }
}

// ─── Extraction + enforcement ────────────────────────────────────────────────

/// Produce exactly one [`FactValue`] per catalog code.
///
/// Guarantees, in order:
/// - every catalog code receives an entry (possibly the canonical empty);
/// - codes the capability invented are rejected, not stored;
/// - values whose shape contradicts the catalog's [`ValueKind`] are nulled;
/// - citation integrity is enforced against the run's snippet-id set.
///
/// Returns the facts and whether extraction degraded (capability failure).
pub async fn extract_facts<E>(
  extractor: &E,
  snippets: &[EvidenceSnippet],
  catalog: &FactCatalog,
) -> (BTreeMap<String, FactValue>, bool)
where
  E: FactExtractor,
{
  if snippets.is_empty() {
    return (empty_facts(catalog), false);
  }

  let mut candidates = match extractor.extract(snippets, catalog).await {
    Ok(c) => c,
    Err(e) => {
      warn!(error = %e, "fact extraction unavailable; emitting all-empty facts");
      return (empty_facts(catalog), true);
    }
  };

  for code in candidates.keys() {
    if !catalog.contains(code) {
      warn!(code = %code, "extractor returned unknown fact code; rejected");
    }
  }

  let known: std::collections::BTreeSet<SnippetId> =
    snippets.iter().map(|s| s.id.clone()).collect();

  let mut facts = BTreeMap::new();
  for def in catalog.definitions() {
    let fact = match candidates.remove(def.code) {
      Some(candidate) => {
        let mut fact = FactValue {
          code:       def.code.to_owned(),
          value:      candidate.value,
          unit:       def.unit.map(str::to_owned),
          citations:  candidate.citations,
          tier:       candidate.tier,
          artifacts:  candidate.artifacts,
          candidates: Vec::new(),
        };

        if let Some(value) = &fact.value {
          if !matches_kind(value, def.kind) {
            warn!(
              code = def.code,
              expected = ?def.kind,
              "extracted value has wrong shape; nulled"
            );
            fact = FactValue::empty(def.code);
          }
        }

        let stripped = fact.strip_unknown_citations(&known);
        if stripped > 0 {
          warn!(
            code = def.code,
            stripped,
            cited = fact.is_cited(),
            "stripped citations outside the run's snippet set"
          );
        }
        // A null value must not carry citations either.
        if fact.value.is_none() && !fact.citations.is_empty() {
          fact = FactValue::empty(def.code);
        }
        fact
      }
      None => FactValue::empty(def.code),
    };
    facts.insert(def.code.to_owned(), fact);
  }

  (facts, false)
}

/// The all-empty fact set: one canonical empty value per catalog code.
pub fn empty_facts(catalog: &FactCatalog) -> BTreeMap<String, FactValue> {
  catalog
    .definitions()
    .iter()
    .map(|d| (d.code.to_owned(), FactValue::empty(d.code)))
    .collect()
}

fn matches_kind(value: &Value, kind: ValueKind) -> bool {
  matches!(
    (value, kind),
    (Value::Number(_), ValueKind::Number)
      | (Value::Date(_), ValueKind::Date)
      | (Value::Text(_), ValueKind::Text)
      | (Value::Flag(_), ValueKind::Flag)
  )
}

// ─── Tests ───────────────────────────────────────────────────────────────────
