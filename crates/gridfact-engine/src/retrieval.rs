//! Snippet retrieval seams and the mandatory merge step.
//!
//! Retrieval is the only profitably concurrent phase: the four module query
//! sets fan out in parallel. The merge afterwards — dedup by content-hash
//! id, sort by relevance descending with id as tie-break, truncate to
//! [`SNIPPET_CAP`] — makes the deterministic stages' input independent of
//! retrieval completion order. A failed module query degrades to an empty
//! hit list; it never aborts the run.

use std::future::Future;

use gridfact_core::{
  catalog::{FactCatalog, Module},
  contract::{DealSnapshot, MarketContext},
  snippet::EvidenceSnippet,
};
use tracing::warn;

/// Upper bound on snippets entering the deterministic stages.
pub const SNIPPET_CAP: usize = 120;

// ─── Collaborator traits ─────────────────────────────────────────────────────

/// The evidence-retrieval collaborator: module queries in, unordered
/// snippet hits out. The core owns dedup, ordering, and the cap.
pub trait SnippetRetriever: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn retrieve(
    &self,
    module: Module,
    queries: &[&'static str],
  ) -> impl Future<Output = Result<Vec<EvidenceSnippet>, Self::Error>> + Send;
}

/// Optional market-color collaborator. A failure here must never fail the
/// run; the contract simply carries no market context.
pub trait MarketContextProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn market_context(
    &self,
    deal: &DealSnapshot,
  ) -> impl Future<Output = Result<MarketContext, Self::Error>> + Send;
}

/// Provider used when no market collaborator is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMarketContext;

impl MarketContextProvider for NoMarketContext {
  type Error = std::convert::Infallible;

  async fn market_context(
    &self,
    _deal: &DealSnapshot,
  ) -> Result<MarketContext, Self::Error> {
    // Never called with a context to give; pipeline treats the absence of
    // a provider separately.
    Ok(MarketContext {
      region:             String::new(),
      spot_price_eur_mwh: None,
      colo_vacancy_pct:   None,
      notes:              Vec::new(),
    })
  }
}

/// Retriever over a fixed, caller-supplied snippet corpus (a CLI snippets
/// file, an API request body). The corpus is not partitioned by module:
/// every module query sees the whole set and the merge step dedups.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
  snippets: Vec<EvidenceSnippet>,
}

impl StaticRetriever {
  pub fn new(snippets: Vec<EvidenceSnippet>) -> Self {
    Self { snippets }
  }
}

impl SnippetRetriever for StaticRetriever {
  type Error = std::convert::Infallible;

  async fn retrieve(
    &self,
    _module: Module,
    _queries: &[&'static str],
  ) -> Result<Vec<EvidenceSnippet>, Self::Error> {
    Ok(self.snippets.clone())
  }
}

// ─── Fan-out and merge ───────────────────────────────────────────────────────

/// Retrieve snippets for every module in parallel and merge them into the
/// canonical ordered, capped set. Returns the snippets and whether any
/// module query failed (degraded evidence).
pub async fn gather_snippets<R>(
  retriever: &R,
  catalog: &FactCatalog,
) -> (Vec<EvidenceSnippet>, bool)
where
  R: SnippetRetriever,
{
  let (power, permits, connectivity, commercial) = tokio::join!(
    retrieve_module(retriever, catalog, Module::PowerGrid),
    retrieve_module(retriever, catalog, Module::PermitsLand),
    retrieve_module(retriever, catalog, Module::Connectivity),
    retrieve_module(retriever, catalog, Module::Commercial),
  );

  let mut degraded = false;
  let mut all = Vec::new();
  for (hits, ok) in [power, permits, connectivity, commercial] {
    degraded |= !ok;
    all.extend(hits);
  }

  (merge_snippets(all), degraded)
}

async fn retrieve_module<R>(
  retriever: &R,
  catalog: &FactCatalog,
  module: Module,
) -> (Vec<EvidenceSnippet>, bool)
where
  R: SnippetRetriever,
{
  let queries = catalog.queries_for(module);
  match retriever.retrieve(module, &queries).await {
    Ok(hits) => (hits, true),
    Err(e) => {
      warn!(module = ?module, error = %e, "snippet retrieval failed; degrading to empty hit list");
      (Vec::new(), false)
    }
  }
}

/// The mandatory ordering/cap step: dedup by id keeping the highest
/// relevance reading, sort relevance-descending with id ascending as
/// tie-break, truncate to [`SNIPPET_CAP`].
pub fn merge_snippets(hits: Vec<EvidenceSnippet>) -> Vec<EvidenceSnippet> {
  let mut by_id: std::collections::BTreeMap<_, EvidenceSnippet> =
    std::collections::BTreeMap::new();
  for hit in hits {
    match by_id.get(&hit.id) {
      Some(existing) if existing.provenance.relevance >= hit.provenance.relevance => {}
      _ => {
        by_id.insert(hit.id.clone(), hit);
      }
    }
  }

  let mut merged: Vec<EvidenceSnippet> = by_id.into_values().collect();
  merged.sort_by(|a, b| {
    b.provenance
      .relevance
      .total_cmp(&a.provenance.relevance)
      .then_with(|| a.id.cmp(&b.id))
  });
  merged.truncate(SNIPPET_CAP);
  merged
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use gridfact_core::snippet::Provenance;

  use super::*;

  fn snip(source: &str, text: &str, relevance: f64) -> EvidenceSnippet {
    EvidenceSnippet::new(text, Provenance {
      document_id: None,
      source: source.into(),
      query: "q".into(),
      relevance,
    })
  }

  #[test]
  fn merge_dedups_by_content_hash() {
    let merged = merge_snippets(vec![
      snip("a.pdf", "24 MW reserved", 0.4),
      snip("a.pdf", "24 MW reserved", 0.9),
      snip("b.pdf", "110 kV", 0.5),
    ]);
    assert_eq!(merged.len(), 2);
    // The duplicate kept the higher relevance reading.
    let dup = merged.iter().find(|s| s.text == "24 MW reserved").unwrap();
    assert_eq!(dup.provenance.relevance, 0.9);
  }

  #[test]
  fn merge_order_is_independent_of_arrival_order() {
    let a = snip("a.pdf", "one", 0.7);
    let b = snip("b.pdf", "two", 0.7);
    let c = snip("c.pdf", "three", 0.9);

    let m1 = merge_snippets(vec![a.clone(), b.clone(), c.clone()]);
    let m2 = merge_snippets(vec![c, b, a]);
    assert_eq!(m1, m2);
    assert_eq!(m1[0].text, "three");
    // Equal relevance ties break on id, ascending.
    assert!(m1[1].id < m1[2].id);
  }

  #[test]
  fn merge_truncates_to_cap() {
    let hits: Vec<_> = (0..SNIPPET_CAP + 40)
      .map(|i| snip("doc.pdf", &format!("snippet number {i}"), 0.5))
      .collect();
    assert_eq!(merge_snippets(hits).len(), SNIPPET_CAP);
  }
}
