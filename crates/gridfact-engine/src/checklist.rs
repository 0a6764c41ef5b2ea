//! The audit checklist — what to ask the seller for next.
//!
//! One evidence-request item per fact without usable evidence, naming the
//! strongest expected artifact kind; one item per unresolved contradiction;
//! a timeline item when the connection-queue reservation is close to
//! expiry. Hard-gate items are marked blocking.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use gridfact_core::{
  catalog::{ArtifactKind, FactCatalog},
  contract::{Checklist, ChecklistItem, TimelineRisk},
  fact::{Contradiction, FactValue, Severity},
};

// Queue-expiry proximity thresholds, in days.
const EXPIRY_CRITICAL_DAYS: i64 = 60;
const EXPIRY_HIGH_DAYS: i64 = 180;
const EXPIRY_MEDIUM_DAYS: i64 = 365;

/// Build the checklist and the deduplicated list of requested artifacts.
pub fn build_checklist(
  catalog: &FactCatalog,
  facts: &BTreeMap<String, FactValue>,
  contradictions: &[Contradiction],
  as_of: NaiveDate,
) -> (Checklist, Vec<ArtifactKind>) {
  let mut items = Vec::new();
  let mut requested = Vec::new();

  for def in catalog.definitions() {
    let cited = facts.get(def.code).is_some_and(FactValue::is_cited);
    if cited {
      continue;
    }
    let artifact = def.artifacts.first().copied();
    if let Some(a) = artifact {
      requested.push(a);
    }
    items.push(ChecklistItem {
      fact_code:          Some(def.code.to_owned()),
      title:              format!("Evidence missing: {}", def.code),
      detail:             format!(
        "{}: no cited value for {}; request {}",
        def.module.label(),
        def.code,
        artifact.map_or("supporting documentation".to_owned(), |a| {
          format!("{a:?}")
        })
      ),
      requested_artifact: artifact,
      blocking:           def.hard_gate,
    });
  }

  for contradiction in contradictions {
    items.push(ChecklistItem {
      fact_code:          Some(contradiction.fact_code.clone()),
      title:              format!(
        "Resolve contradiction: {}",
        contradiction.fact_code
      ),
      detail:             contradiction.description.clone(),
      requested_artifact: None,
      blocking:           contradiction.severity == Severity::High,
    });
  }

  let timeline_risk = queue_timeline_risk(facts, as_of);
  if timeline_risk >= TimelineRisk::High {
    items.push(ChecklistItem {
      fact_code:          Some(
        gridfact_core::catalog::codes::QUEUE_EXPIRY_DATE.to_owned(),
      ),
      title:              "Queue reservation close to expiry".to_owned(),
      detail:             format!(
        "connection-queue reservation timeline risk is {timeline_risk:?}; confirm extension terms with the grid operator"
      ),
      requested_artifact: Some(ArtifactKind::QueuePositionStatement),
      blocking:           timeline_risk == TimelineRisk::Critical,
    });
  }

  requested.sort();
  requested.dedup();

  (Checklist { items, timeline_risk }, requested)
}

/// Timeline risk from queue-expiry proximity. An already-expired or
/// near-term expiry is CRITICAL; no known expiry date reads as LOW.
fn queue_timeline_risk(
  facts: &BTreeMap<String, FactValue>,
  as_of: NaiveDate,
) -> TimelineRisk {
  let expiry = facts
    .get(gridfact_core::catalog::codes::QUEUE_EXPIRY_DATE)
    .and_then(|f| f.value.as_ref())
    .and_then(|v| v.as_date());
  let Some(expiry) = expiry else {
    return TimelineRisk::Low;
  };

  let days = expiry.signed_duration_since(as_of).num_days();
  if days < EXPIRY_CRITICAL_DAYS {
    TimelineRisk::Critical
  } else if days < EXPIRY_HIGH_DAYS {
    TimelineRisk::High
  } else if days < EXPIRY_MEDIUM_DAYS {
    TimelineRisk::Medium
  } else {
    TimelineRisk::Low
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
