//! The fact catalog — the static registry of everything the pipeline knows
//! how to ask about a deal.
//!
//! A [`FactDefinition`] is pure configuration: code, due-diligence module,
//! value shape, hard-gate flag, the artifact kinds that count as evidence,
//! and the retrieval query templates used to pull snippets for it. The
//! catalog is built once and passed by reference through the pipeline; it is
//! never a process-wide singleton.

use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::{Error, Result};

// ─── Modules ─────────────────────────────────────────────────────────────────

/// One due-diligence domain. Every fact belongs to exactly one module.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter,
  Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Module {
  PowerGrid,
  PermitsLand,
  Connectivity,
  Commercial,
}

impl Module {
  /// Human-readable name used in rationales and report rows.
  pub fn label(self) -> &'static str {
    match self {
      Self::PowerGrid => "Power & Grid",
      Self::PermitsLand => "Permits & Land",
      Self::Connectivity => "Connectivity",
      Self::Commercial => "Commercial",
    }
  }
}

// ─── Value kinds ─────────────────────────────────────────────────────────────

/// The scalar shape a fact's value must take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
  Number,
  Date,
  Text,
  Flag,
}

// ─── Artifact kinds ──────────────────────────────────────────────────────────

/// A document class that can back a fact. Used both to describe where a
/// value came from and to name what to request when evidence is missing.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  GridOperatorConfirmation,
  SignedConnectionAgreement,
  PaymentReceipt,
  QueuePositionStatement,
  CurtailmentStudy,
  BuildingPermitDecision,
  ZoningPlanExtract,
  EnvironmentalDecision,
  LandRegistryExtract,
  LeaseAgreement,
  OptionAgreement,
  FiberProviderOffer,
  TechnicalDueDiligenceReport,
  CustomerLoi,
  CustomerContract,
  FinancialModel,
  SellerPresentation,
}

// ─── Fact codes ──────────────────────────────────────────────────────────────

/// Canonical fact codes. These are the only keys the pipeline accepts;
/// unknown codes are rejected at load time, never silently stored.
pub mod codes {
  pub const RESERVED_MW: &str = "reserved_mw";
  pub const GRID_TITLE_LEVEL: &str = "grid_title_level";
  pub const FIRMNESS: &str = "firmness";
  pub const CONNECTION_VOLTAGE_KV: &str = "connection_voltage_kv";
  pub const QUEUE_POSITION: &str = "queue_position";
  pub const QUEUE_EXPIRY_DATE: &str = "queue_expiry_date";
  pub const CURTAILMENT_PCT: &str = "curtailment_pct";
  pub const FLEX_OBLIGATION_PCT: &str = "flex_obligation_pct";
  pub const GRID_AGREEMENT: &str = "grid_agreement";
  pub const ENERGIZATION_DATE: &str = "energization_date";
  pub const DEEP_WORKS_REQUIRED: &str = "deep_works_required";

  pub const BUILDING_PERMIT: &str = "building_permit";
  pub const ZONING_STATUS: &str = "zoning_status";
  pub const PERMIT_APPEAL_RISK: &str = "permit_appeal_risk";
  pub const ENVIRONMENTAL_CLEARANCE: &str = "environmental_clearance";
  pub const LAND_CONTROL: &str = "land_control";
  pub const LAND_AREA_HA: &str = "land_area_ha";

  pub const FIBER_PROVIDER_COUNT: &str = "fiber_provider_count";
  pub const LATENCY_MS: &str = "latency_ms";
  pub const IT_CAPACITY_MW: &str = "it_capacity_mw";

  pub const ANCHOR_CUSTOMER: &str = "anchor_customer";
  pub const CUSTOMER_PIPELINE_COUNT: &str = "customer_pipeline_count";
  pub const CAPEX_EUR: &str = "capex_eur";
  pub const DEAL_TYPE: &str = "deal_type";
}

// ─── FactDefinition ──────────────────────────────────────────────────────────

/// Immutable definition of one fact the pipeline tracks.
///
/// Definitions are static configuration and are never serialized; only the
/// values derived from them enter the contract.
#[derive(Debug, Clone)]
pub struct FactDefinition {
  /// Unique key; see [`codes`].
  pub code:      &'static str,
  pub module:    Module,
  pub kind:      ValueKind,
  /// Display unit, e.g. `"MW"`, `"kV"`, `"ha"`.
  pub unit:      Option<&'static str>,
  /// Facts with this flag participate in hard-gate evaluation and drag the
  /// overall status toward conservative when unknown.
  pub hard_gate: bool,
  /// Artifact kinds that count as evidence for this fact, strongest first.
  pub artifacts: &'static [ArtifactKind],
  /// Retrieval query templates fanned out to the snippet retriever.
  pub queries:   &'static [&'static str],
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Read-only registry of [`FactDefinition`]s.
#[derive(Debug, Clone)]
pub struct FactCatalog {
  defs: Vec<FactDefinition>,
}

impl FactCatalog {
  /// Build a catalog from explicit definitions, rejecting duplicate codes.
  pub fn new(defs: Vec<FactDefinition>) -> Result<Self> {
    let mut seen = std::collections::BTreeSet::new();
    for def in &defs {
      if !seen.insert(def.code) {
        return Err(Error::DuplicateFactCode(def.code.to_owned()));
      }
    }
    Ok(Self { defs })
  }

  /// The standard catalog covering all four due-diligence modules.
  pub fn standard() -> Self {
    // Codes are unique by construction below.
    Self { defs: standard_definitions() }
  }

  /// Look up a definition by code.
  pub fn get(&self, code: &str) -> Result<&FactDefinition> {
    self
      .defs
      .iter()
      .find(|d| d.code == code)
      .ok_or_else(|| Error::UnknownFactCode(code.to_owned()))
  }

  /// `true` if `code` is a member of this catalog.
  pub fn contains(&self, code: &str) -> bool {
    self.defs.iter().any(|d| d.code == code)
  }

  /// All definitions belonging to `module`, in catalog order.
  pub fn by_module(&self, module: Module) -> Vec<&FactDefinition> {
    self.defs.iter().filter(|d| d.module == module).collect()
  }

  /// All hard-gate definitions, in catalog order.
  pub fn hard_gates(&self) -> Vec<&FactDefinition> {
    self.defs.iter().filter(|d| d.hard_gate).collect()
  }

  /// Deduplicated retrieval query templates for `module`.
  pub fn queries_for(&self, module: Module) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for def in self.by_module(module) {
      for q in def.queries {
        if !out.contains(q) {
          out.push(q);
        }
      }
    }
    out
  }

  /// All definitions, in catalog order.
  pub fn definitions(&self) -> &[FactDefinition] { &self.defs }

  pub fn len(&self) -> usize { self.defs.len() }

  pub fn is_empty(&self) -> bool { self.defs.is_empty() }
}

// ─── Standard definitions ────────────────────────────────────────────────────

fn standard_definitions() -> Vec<FactDefinition> {
  use ArtifactKind::*;
  use Module::*;
  use ValueKind::*;
  use codes::*;

  vec![
    // ── Power & Grid ─────────────────────────────────────────────────────
    FactDefinition {
      code:      RESERVED_MW,
      module:    PowerGrid,
      kind:      Number,
      unit:      Some("MW"),
      hard_gate: true,
      artifacts: &[SignedConnectionAgreement, GridOperatorConfirmation],
      queries:   &[
        "reserved grid capacity MW",
        "connection agreement contracted power",
      ],
    },
    FactDefinition {
      code:      GRID_TITLE_LEVEL,
      module:    PowerGrid,
      kind:      Number,
      unit:      None,
      hard_gate: true,
      artifacts: &[PaymentReceipt, SignedConnectionAgreement, GridOperatorConfirmation],
      queries:   &[
        "grid connection agreement status signed",
        "connection fee paid invoice",
      ],
    },
    FactDefinition {
      code:      FIRMNESS,
      module:    PowerGrid,
      kind:      Text,
      unit:      None,
      hard_gate: true,
      artifacts: &[GridOperatorConfirmation, SignedConnectionAgreement],
      queries:   &["firm capacity non-firm interruptible connection"],
    },
    FactDefinition {
      code:      CONNECTION_VOLTAGE_KV,
      module:    PowerGrid,
      kind:      Number,
      unit:      Some("kV"),
      hard_gate: false,
      artifacts: &[GridOperatorConfirmation, TechnicalDueDiligenceReport],
      queries:   &["connection voltage kV substation"],
    },
    FactDefinition {
      code:      QUEUE_POSITION,
      module:    PowerGrid,
      kind:      Number,
      unit:      None,
      hard_gate: false,
      artifacts: &[QueuePositionStatement],
      queries:   &["interconnection queue position"],
    },
    FactDefinition {
      code:      QUEUE_EXPIRY_DATE,
      module:    PowerGrid,
      kind:      Date,
      unit:      None,
      hard_gate: false,
      artifacts: &[QueuePositionStatement, GridOperatorConfirmation],
      queries:   &["queue reservation expiry deadline"],
    },
    FactDefinition {
      code:      CURTAILMENT_PCT,
      module:    PowerGrid,
      kind:      Number,
      unit:      Some("%"),
      hard_gate: true,
      artifacts: &[CurtailmentStudy, GridOperatorConfirmation],
      queries:   &["expected curtailment percentage"],
    },
    FactDefinition {
      code:      FLEX_OBLIGATION_PCT,
      module:    PowerGrid,
      kind:      Number,
      unit:      Some("%"),
      hard_gate: true,
      artifacts: &[GridOperatorConfirmation, SignedConnectionAgreement],
      queries:   &["flexible connection obligation demand response"],
    },
    FactDefinition {
      code:      GRID_AGREEMENT,
      module:    PowerGrid,
      kind:      Flag,
      unit:      None,
      hard_gate: false,
      artifacts: &[SignedConnectionAgreement],
      queries:   &["grid connection agreement executed"],
    },
    FactDefinition {
      code:      ENERGIZATION_DATE,
      module:    PowerGrid,
      kind:      Date,
      unit:      None,
      hard_gate: false,
      artifacts: &[GridOperatorConfirmation, TechnicalDueDiligenceReport],
      queries:   &["energization date grid connection live"],
    },
    FactDefinition {
      code:      DEEP_WORKS_REQUIRED,
      module:    PowerGrid,
      kind:      Flag,
      unit:      None,
      hard_gate: false,
      artifacts: &[GridOperatorConfirmation, TechnicalDueDiligenceReport],
      queries:   &["deep reinforcement works transmission upgrade required"],
    },
    // ── Permits & Land ───────────────────────────────────────────────────
    FactDefinition {
      code:      BUILDING_PERMIT,
      module:    PermitsLand,
      kind:      Text,
      unit:      None,
      hard_gate: true,
      artifacts: &[BuildingPermitDecision],
      queries:   &["building permit granted status"],
    },
    FactDefinition {
      code:      ZONING_STATUS,
      module:    PermitsLand,
      kind:      Text,
      unit:      None,
      hard_gate: false,
      artifacts: &[ZoningPlanExtract],
      queries:   &["zoning plan data center industrial use"],
    },
    FactDefinition {
      code:      PERMIT_APPEAL_RISK,
      module:    PermitsLand,
      kind:      Flag,
      unit:      None,
      hard_gate: false,
      artifacts: &[BuildingPermitDecision],
      queries:   &["permit appeal objection pending"],
    },
    FactDefinition {
      code:      ENVIRONMENTAL_CLEARANCE,
      module:    PermitsLand,
      kind:      Text,
      unit:      None,
      hard_gate: false,
      artifacts: &[EnvironmentalDecision],
      queries:   &["environmental impact assessment decision"],
    },
    FactDefinition {
      code:      LAND_CONTROL,
      module:    PermitsLand,
      kind:      Text,
      unit:      None,
      hard_gate: true,
      artifacts: &[LandRegistryExtract, LeaseAgreement, OptionAgreement],
      queries:   &["land ownership freehold lease option"],
    },
    FactDefinition {
      code:      LAND_AREA_HA,
      module:    PermitsLand,
      kind:      Number,
      unit:      Some("ha"),
      hard_gate: false,
      artifacts: &[LandRegistryExtract, ZoningPlanExtract],
      queries:   &["site area hectares plot size"],
    },
    // ── Connectivity ─────────────────────────────────────────────────────
    FactDefinition {
      code:      FIBER_PROVIDER_COUNT,
      module:    Connectivity,
      kind:      Number,
      unit:      None,
      hard_gate: false,
      artifacts: &[FiberProviderOffer],
      queries:   &["fiber providers dark fiber carriers on site"],
    },
    FactDefinition {
      code:      LATENCY_MS,
      module:    Connectivity,
      kind:      Number,
      unit:      Some("ms"),
      hard_gate: false,
      artifacts: &[FiberProviderOffer, TechnicalDueDiligenceReport],
      queries:   &["round trip latency internet exchange"],
    },
    FactDefinition {
      code:      IT_CAPACITY_MW,
      module:    Connectivity,
      kind:      Number,
      unit:      Some("MW"),
      hard_gate: false,
      artifacts: &[TechnicalDueDiligenceReport],
      queries:   &["IT load capacity design MW"],
    },
    // ── Commercial ───────────────────────────────────────────────────────
    FactDefinition {
      code:      ANCHOR_CUSTOMER,
      module:    Commercial,
      kind:      Flag,
      unit:      None,
      hard_gate: true,
      artifacts: &[CustomerContract, CustomerLoi],
      queries:   &["anchor tenant customer LOI signed"],
    },
    FactDefinition {
      code:      CUSTOMER_PIPELINE_COUNT,
      module:    Commercial,
      kind:      Number,
      unit:      None,
      hard_gate: false,
      artifacts: &[CustomerLoi, SellerPresentation],
      queries:   &["customer pipeline prospective tenants"],
    },
    FactDefinition {
      code:      CAPEX_EUR,
      module:    Commercial,
      kind:      Number,
      unit:      Some("EUR"),
      hard_gate: false,
      artifacts: &[FinancialModel],
      queries:   &["total capex investment budget"],
    },
    FactDefinition {
      code:      DEAL_TYPE,
      module:    Commercial,
      kind:      Text,
      unit:      None,
      hard_gate: false,
      artifacts: &[SellerPresentation],
      queries:   &["transaction structure asset share deal"],
    },
  ]
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn standard_catalog_has_unique_codes() {
    let catalog = FactCatalog::standard();
    let mut codes: Vec<_> =
      catalog.definitions().iter().map(|d| d.code).collect();
    let before = codes.len();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), before);
  }

  #[test]
  fn every_module_has_definitions_and_queries() {
    let catalog = FactCatalog::standard();
    for module in Module::iter() {
      assert!(!catalog.by_module(module).is_empty(), "{module:?}");
      assert!(!catalog.queries_for(module).is_empty(), "{module:?}");
    }
  }

  #[test]
  fn lookup_unknown_code_fails() {
    let catalog = FactCatalog::standard();
    assert!(matches!(
      catalog.get("no_such_fact"),
      Err(Error::UnknownFactCode(_))
    ));
  }

  #[test]
  fn hard_gates_are_flagged() {
    let catalog = FactCatalog::standard();
    let gates = catalog.hard_gates();
    assert!(gates.iter().any(|d| d.code == codes::RESERVED_MW));
    assert!(gates.iter().any(|d| d.code == codes::LAND_CONTROL));
    assert!(gates.iter().all(|d| d.hard_gate));
  }

  #[test]
  fn duplicate_codes_rejected() {
    let defs = vec![
      FactCatalog::standard().definitions()[0].clone(),
      FactCatalog::standard().definitions()[0].clone(),
    ];
    assert!(matches!(
      FactCatalog::new(defs),
      Err(Error::DuplicateFactCode(_))
    ));
  }
}
