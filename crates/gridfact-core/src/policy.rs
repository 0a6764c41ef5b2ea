//! Fund policy snapshots — the versioned rulebook a run is judged against.
//!
//! A snapshot is copied into the run at start and frozen into the contract,
//! so later policy edits never retroactively change historical decisions.
//! Construction validates the module weights; a policy whose weights do not
//! sum to exactly 100 is rejected before any scoring happens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  catalog::{Module, codes},
  fact::{EvidenceTier, Firmness, LandControl, PermitLevel},
};

// ─── Module weights ──────────────────────────────────────────────────────────

/// Per-module weights for the overall score. Must sum to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleWeights {
  pub power_grid:   u8,
  pub permits_land: u8,
  pub connectivity: u8,
  pub commercial:   u8,
}

impl ModuleWeights {
  pub fn new(
    power_grid: u8,
    permits_land: u8,
    connectivity: u8,
    commercial: u8,
  ) -> Result<Self> {
    let weights = Self { power_grid, permits_land, connectivity, commercial };
    weights.validate()?;
    Ok(weights)
  }

  pub fn validate(&self) -> Result<()> {
    let total = self.power_grid as u16
      + self.permits_land as u16
      + self.connectivity as u16
      + self.commercial as u16;
    if total != 100 {
      return Err(Error::WeightSum { total });
    }
    Ok(())
  }

  pub fn weight(&self, module: Module) -> u8 {
    match module {
      Module::PowerGrid => self.power_grid,
      Module::PermitsLand => self.permits_land,
      Module::Connectivity => self.connectivity,
      Module::Commercial => self.commercial,
    }
  }
}

// ─── Hard gates ──────────────────────────────────────────────────────────────

/// The rejection rules. A failed gate forces NO_GO regardless of score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardGates {
  /// Minimum power-title level, on the 0–5 ladder
  /// (0 none, 1 enquiry, 2 application, 3 offer, 4 signed, 5 signed+paid).
  pub min_grid_title_level: u8,
  pub min_land_control:     LandControl,
  pub min_permit_level:     PermitLevel,
  /// Firmness values the fund accepts.
  pub accepted_firmness:    Vec<Firmness>,
  pub require_anchor_customer: bool,
  /// Ceiling on expected curtailment, in percent.
  pub max_curtailment_pct:  f64,
  /// Ceiling on contractual flexibility obligations, in percent.
  pub max_flex_obligation_pct: f64,
}

// ─── Tolerances ──────────────────────────────────────────────────────────────

/// Numeric tolerances for the contradiction detector, in percent.
/// Facts without an entry compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
  pub mw_pct:    f64,
  pub capex_pct: f64,
  pub area_pct:  f64,
}

impl Tolerances {
  /// The tolerance (percent) applying to `code`, if any.
  pub fn for_code(&self, code: &str) -> Option<f64> {
    match code {
      codes::RESERVED_MW | codes::IT_CAPACITY_MW => Some(self.mw_pct),
      codes::CAPEX_EUR => Some(self.capex_pct),
      codes::LAND_AREA_HA => Some(self.area_pct),
      _ => None,
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Immutable copy-at-run-time of the fund's evaluation rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundPolicySnapshot {
  pub policy_name: String,
  pub policy_version: String,
  pub captured_at: DateTime<Utc>,
  pub hard_gates:  HardGates,
  pub weights:     ModuleWeights,
  pub tolerances:  Tolerances,
  /// Minimum evidence tier for a hard-gate fact to count as satisfied.
  pub min_gate_tier: EvidenceTier,
  /// Deal types the fund prefers; informational, never gating.
  pub preferred_deal_types: Vec<String>,
  /// HOLD when more than this many hard-gate facts remain unknown even
  /// though every evaluated gate passed.
  pub max_unknown_critical: usize,
}

impl FundPolicySnapshot {
  /// Validate the snapshot before it enters a run.
  pub fn validate(&self) -> Result<()> {
    self.weights.validate()?;
    Ok(())
  }

  /// The shipped default policy for powered-land / data-center deals.
  pub fn default_policy(captured_at: DateTime<Utc>) -> Self {
    Self {
      policy_name: "powered-land-default".into(),
      policy_version: "2025.1".into(),
      captured_at,
      hard_gates: HardGates {
        min_grid_title_level: 3,
        min_land_control: LandControl::Leasehold,
        min_permit_level: PermitLevel::Submitted,
        accepted_firmness: vec![Firmness::Firm, Firmness::PartiallyFirm],
        require_anchor_customer: false,
        max_curtailment_pct: 10.0,
        max_flex_obligation_pct: 20.0,
      },
      weights: ModuleWeights {
        power_grid:   40,
        permits_land: 30,
        connectivity: 10,
        commercial:   20,
      },
      tolerances: Tolerances { mw_pct: 5.0, capex_pct: 10.0, area_pct: 10.0 },
      min_gate_tier: EvidenceTier::SellerStatement,
      preferred_deal_types: vec!["asset_deal".into(), "share_deal".into()],
      max_unknown_critical: 3,
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_policy_validates() {
    let policy = FundPolicySnapshot::default_policy(Utc::now());
    assert!(policy.validate().is_ok());
  }

  #[test]
  fn weights_must_sum_to_100() {
    assert!(ModuleWeights::new(40, 30, 10, 20).is_ok());
    assert!(matches!(
      ModuleWeights::new(40, 30, 10, 19),
      Err(Error::WeightSum { total: 99 })
    ));
    assert!(matches!(
      ModuleWeights::new(50, 30, 10, 20),
      Err(Error::WeightSum { total: 110 })
    ));
  }

  #[test]
  fn tolerance_table_covers_numeric_codes() {
    let t = Tolerances { mw_pct: 5.0, capex_pct: 10.0, area_pct: 10.0 };
    assert_eq!(t.for_code(codes::RESERVED_MW), Some(5.0));
    assert_eq!(t.for_code(codes::CAPEX_EUR), Some(10.0));
    assert_eq!(t.for_code(codes::LAND_AREA_HA), Some(10.0));
    assert_eq!(t.for_code(codes::FIRMNESS), None);
  }
}
