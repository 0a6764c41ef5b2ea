//! The analysis pipeline, end to end.
//!
//! Retrieval fans out concurrently; everything after the merged snippet set
//! is pure and sequential, so identical (snippets, policy) inputs produce
//! identical contracts. Collaborator failures degrade the run to PARTIAL
//! instead of aborting it; only schema validation can mark a run FAILED.

use chrono::{DateTime, Utc};
use gridfact_core::{
  catalog::FactCatalog,
  contract::{DDContract, DealSnapshot, GateOutcome, MarketContext},
  policy::FundPolicySnapshot,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  assemble::{AssemblyParts, assemble},
  checklist::build_checklist,
  contradiction,
  energization::{EnergizationInputs, build_curve},
  extract::{FactExtractor, extract_facts},
  gates::evaluate_gates,
  patterns::pattern_candidates,
  retrieval::{MarketContextProvider, SnippetRetriever, gather_snippets},
  scorer::score_modules,
};

/// One analysis run's identity and frozen inputs. The caller mints the run
/// id and timestamp so runs are replayable.
#[derive(Debug, Clone)]
pub struct RunRequest {
  pub run_id:     Uuid,
  pub created_at: DateTime<Utc>,
  pub deal:       DealSnapshot,
  pub policy:     FundPolicySnapshot,
}

impl RunRequest {
  pub fn new(deal: DealSnapshot, policy: FundPolicySnapshot) -> Self {
    Self {
      run_id: Uuid::new_v4(),
      created_at: Utc::now(),
      deal,
      policy,
    }
  }
}

/// Run the full pipeline: retrieve, extract, cross-validate, gate, score,
/// project, checklist, assemble.
pub async fn run_analysis<R, E, M>(
  retriever: &R,
  extractor: &E,
  market_provider: Option<&M>,
  catalog: &FactCatalog,
  request: RunRequest,
) -> DDContract
where
  R: SnippetRetriever,
  E: FactExtractor,
  M: MarketContextProvider,
{
  let RunRequest { run_id, created_at, deal, policy } = request;
  info!(%run_id, deal = %deal.name, "starting analysis run");

  let (snippets, retrieval_degraded) =
    gather_snippets(retriever, catalog).await;
  let (mut facts, extraction_degraded) =
    extract_facts(extractor, &snippets, catalog).await;

  let candidates = pattern_candidates(&snippets);
  let detected = contradiction::detect(
    &candidates,
    &facts,
    &snippets,
    &policy.tolerances,
  );
  // Surface the competing readings on the facts themselves.
  for c in &detected.contradictions {
    if let Some(fact) = facts.get_mut(&c.fact_code) {
      fact.candidates = c.candidates.clone();
    }
  }

  let gate_result = evaluate_gates(&policy, &facts);
  let rollup =
    score_modules(catalog, &facts, &detected.contradictions, &policy.weights);

  let red_flag_count = gate_result
    .evaluations
    .iter()
    .filter(|e| e.outcome == GateOutcome::Fail)
    .count();
  let as_of = created_at.date_naive();
  let curve = build_curve(&facts, EnergizationInputs {
    red_flag_count,
    contradiction_count: detected.contradictions.len(),
    as_of,
  });

  let (checklist, requested_artifacts) =
    build_checklist(catalog, &facts, &detected.contradictions, as_of);

  let market = match market_provider {
    Some(provider) => fetch_market(provider, &deal).await,
    None => None,
  };

  let contract = assemble(run_id, created_at, AssemblyParts {
    deal,
    policy,
    snippets,
    facts,
    contradictions: detected.contradictions,
    warnings: detected.warnings,
    requested_artifacts,
    gate_result,
    rollup,
    curve,
    checklist,
    market,
    degraded: retrieval_degraded || extraction_degraded,
  });

  info!(
    %run_id,
    decision = ?contract.scoring.gate_result.decision,
    status = ?contract.run.status,
    score = contract.scoring.overall_score,
    "analysis run complete"
  );
  contract
}

/// Market color is strictly optional: a provider failure is logged and the
/// contract carries no market context.
async fn fetch_market<M>(
  provider: &M,
  deal: &DealSnapshot,
) -> Option<MarketContext>
where
  M: MarketContextProvider,
{
  match provider.market_context(deal).await {
    Ok(context) => Some(context),
    Err(e) => {
      warn!(error = %e, "market context unavailable; continuing without it");
      None
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use gridfact_core::{
    catalog::{ArtifactKind, Module, codes},
    contract::{Decision, ModuleStatus, RunStatus, TimelineRisk},
    fact::{EvidenceTier, Severity, Value},
    snippet::{EvidenceSnippet, Provenance, SnippetId},
  };

  use super::*;
  use crate::{
    extract::ExtractedCandidate,
    retrieval::NoMarketContext,
  };

  #[derive(Debug, thiserror::Error)]
  #[error("stub collaborator failure")]
  struct StubError;

  struct FixedRetriever {
    snippets: Vec<EvidenceSnippet>,
  }

  impl SnippetRetriever for FixedRetriever {
    type Error = StubError;

    async fn retrieve(
      &self,
      _module: Module,
      _queries: &[&'static str],
    ) -> Result<Vec<EvidenceSnippet>, Self::Error> {
      // Same hits for every module; the merge step dedups.
      Ok(self.snippets.clone())
    }
  }

  struct FailingRetriever;

  impl SnippetRetriever for FailingRetriever {
    type Error = StubError;

    async fn retrieve(
      &self,
      _module: Module,
      _queries: &[&'static str],
    ) -> Result<Vec<EvidenceSnippet>, Self::Error> {
      Err(StubError)
    }
  }

  struct MapExtractor {
    candidates: BTreeMap<String, ExtractedCandidate>,
  }

  impl FactExtractor for MapExtractor {
    type Error = StubError;

    async fn extract(
      &self,
      _snippets: &[EvidenceSnippet],
      _catalog: &FactCatalog,
    ) -> Result<BTreeMap<String, ExtractedCandidate>, Self::Error> {
      Ok(self.candidates.clone())
    }
  }

  fn snip(source: &str, text: &str) -> EvidenceSnippet {
    EvidenceSnippet::new(text, Provenance {
      document_id: None,
      source: source.into(),
      query: "q".into(),
      relevance: 0.8,
    })
  }

  fn extracted(
    value: Value,
    citation: &SnippetId,
  ) -> ExtractedCandidate {
    ExtractedCandidate {
      value:     Some(value),
      citations: vec![citation.clone()],
      tier:      EvidenceTier::OfficialSigned,
      artifacts: vec![ArtifactKind::SignedConnectionAgreement],
    }
  }

  fn request() -> RunRequest {
    RunRequest {
      run_id:     Uuid::nil(),
      created_at: chrono::DateTime::parse_from_rfc3339(
        "2026-01-15T09:00:00Z",
      )
      .unwrap()
      .with_timezone(&Utc),
      deal:       DealSnapshot {
        deal_id:   Uuid::nil(),
        name:      "Borlänge North".into(),
        deal_type: Some("powered_land".into()),
        country:   Some("SE".into()),
      },
      policy:     FundPolicySnapshot::default_policy(
        chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
          .unwrap()
          .with_timezone(&Utc),
      ),
    }
  }

  /// Well-evidenced deal: reservation, firmness, permit and land all cited
  /// from official documents.
  fn strong_inputs() -> (FixedRetriever, MapExtractor) {
    let grid = snip(
      "grid-agreement.pdf",
      "Grid operator confirms 24 MW reserved on a firm basis.",
    );
    let permit = snip(
      "permit-decision.pdf",
      "Building permit granted by the municipality.",
    );
    let land =
      snip("land-registry.pdf", "Site secured under a long-term leasehold.");

    let candidates: BTreeMap<String, ExtractedCandidate> = [
      (
        codes::RESERVED_MW.to_owned(),
        extracted(Value::Number(24.0), &grid.id),
      ),
      (
        codes::FIRMNESS.to_owned(),
        extracted(Value::Text("firm".into()), &grid.id),
      ),
      (
        codes::BUILDING_PERMIT.to_owned(),
        extracted(Value::Text("granted".into()), &permit.id),
      ),
      (
        codes::LAND_CONTROL.to_owned(),
        extracted(Value::Text("leasehold".into()), &land.id),
      ),
    ]
    .into();

    (
      FixedRetriever { snippets: vec![grid, permit, land] },
      MapExtractor { candidates },
    )
  }

  #[tokio::test]
  async fn well_evidenced_deal_goes() {
    let (retriever, extractor) = strong_inputs();
    let contract = run_analysis(
      &retriever,
      &extractor,
      None::<&NoMarketContext>,
      &FactCatalog::standard(),
      request(),
    )
    .await;

    assert_eq!(contract.run.status, RunStatus::Success);
    assert_eq!(contract.scoring.gate_result.decision, Decision::Go);
    assert!(contract.evidence.contradictions.is_empty());
    assert!(contract.evidence.facts[codes::RESERVED_MW].is_cited());
    assert!(contract.market.is_none());

    // Four cited facts clear the gates but leave most of the catalog
    // unevidenced: GO pairs with PARTIAL module statuses here.
    let power = contract
      .scoring
      .scorecards
      .iter()
      .find(|e| e.module == Module::PowerGrid)
      .unwrap();
    assert_eq!(power.status, ModuleStatus::Partial);
  }

  #[tokio::test]
  async fn fabricated_citation_is_stripped_and_requested() {
    let (retriever, mut extractor) = strong_inputs();
    // The extractor claims a reservation citing a snippet id that is not
    // part of the run.
    extractor.candidates.insert(
      codes::RESERVED_MW.to_owned(),
      extracted(Value::Number(99.0), &SnippetId("ffffffffffffffff".into())),
    );

    let contract = run_analysis(
      &retriever,
      &extractor,
      None::<&NoMarketContext>,
      &FactCatalog::standard(),
      request(),
    )
    .await;

    let fact = &contract.evidence.facts[codes::RESERVED_MW];
    assert_eq!(fact.value, None);
    assert!(fact.citations.is_empty());
    // The nulled fact shows up as an evidence request.
    assert!(
      contract
        .checklist
        .items
        .iter()
        .any(|i| i.fact_code.as_deref() == Some(codes::RESERVED_MW))
    );
    // Stripping is enforcement, not degradation.
    assert_eq!(contract.run.status, RunStatus::Success);
  }

  #[tokio::test]
  async fn conflicting_voltage_claims_surface_as_contradiction() {
    let (mut retriever, extractor) = strong_inputs();
    retriever.snippets.push(snip(
      "tso-offer.pdf",
      "Connection will be made at the 110 kV substation.",
    ));
    retriever.snippets.push(snip(
      "teaser.pdf",
      "The teaser quotes a 220 kV connection.",
    ));

    let contract = run_analysis(
      &retriever,
      &extractor,
      None::<&NoMarketContext>,
      &FactCatalog::standard(),
      request(),
    )
    .await;

    let contradiction = contract
      .evidence
      .contradictions
      .iter()
      .find(|c| c.fact_code == codes::CONNECTION_VOLTAGE_KV)
      .expect("voltage contradiction");
    assert_eq!(contradiction.severity, Severity::Medium);
    assert!(contradiction.candidates.len() >= 2);
    // Competing readings are surfaced on the fact itself.
    assert!(
      !contract.evidence.facts[codes::CONNECTION_VOLTAGE_KV]
        .candidates
        .is_empty()
    );
  }

  #[tokio::test]
  async fn imminent_queue_expiry_is_critical() {
    let (mut retriever, mut extractor) = strong_inputs();
    let expiry = snip(
      "queue-status.pdf",
      "The reservation expires on 2026-02-28 unless extended.",
    );
    extractor.candidates.insert(
      codes::QUEUE_EXPIRY_DATE.to_owned(),
      extracted(
        Value::Date(chrono::NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()),
        &expiry.id,
      ),
    );
    retriever.snippets.push(expiry);

    let contract = run_analysis(
      &retriever,
      &extractor,
      None::<&NoMarketContext>,
      &FactCatalog::standard(),
      request(),
    )
    .await;

    // 44 days out from the run date.
    assert_eq!(contract.checklist.timeline_risk, TimelineRisk::Critical);
    assert!(
      contract
        .checklist
        .items
        .iter()
        .any(|i| i.blocking && i.title.contains("expiry"))
    );
  }

  #[tokio::test]
  async fn identical_inputs_produce_byte_identical_contracts() {
    let (retriever, extractor) = strong_inputs();
    let catalog = FactCatalog::standard();

    let a = run_analysis(
      &retriever,
      &extractor,
      None::<&NoMarketContext>,
      &catalog,
      request(),
    )
    .await;
    let b = run_analysis(
      &retriever,
      &extractor,
      None::<&NoMarketContext>,
      &catalog,
      request(),
    )
    .await;

    assert_eq!(
      serde_json::to_vec(&a).unwrap(),
      serde_json::to_vec(&b).unwrap()
    );
  }

  #[tokio::test]
  async fn retrieval_failure_degrades_to_partial() {
    let (_, extractor) = strong_inputs();
    let contract = run_analysis(
      &FailingRetriever,
      &extractor,
      None::<&NoMarketContext>,
      &FactCatalog::standard(),
      request(),
    )
    .await;

    assert_eq!(contract.run.status, RunStatus::Partial);
    // No snippets means no usable facts and a conservative decision.
    assert_eq!(contract.scoring.gate_result.decision, Decision::Hold);
    assert!(contract.evidence.snippets.is_empty());
  }
}
