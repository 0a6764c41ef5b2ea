//! Fact values — the citation-backed unit the whole pipeline trades in.
//!
//! A [`FactValue`] is the run's answer for one catalog code. The invariant
//! the pipeline enforces everywhere: a non-null value has at least one
//! citation, and every citation id is a member of the run's snippet set.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{catalog::ArtifactKind, snippet::SnippetId};

// ─── Scalar values ───────────────────────────────────────────────────────────

/// The typed scalar payload of a fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
  Number(f64),
  Date(NaiveDate),
  Text(String),
  Flag(bool),
}

impl Value {
  pub fn as_number(&self) -> Option<f64> {
    match self {
      Self::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_date(&self) -> Option<NaiveDate> {
    match self {
      Self::Date(d) => Some(*d),
      _ => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_flag(&self) -> Option<bool> {
    match self {
      Self::Flag(b) => Some(*b),
      _ => None,
    }
  }

  /// Render for report rows and reasons. Numbers drop a trailing `.0`.
  pub fn display(&self) -> String {
    match self {
      Self::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
      Self::Number(n) => format!("{n}"),
      Self::Date(d) => d.format("%Y-%m-%d").to_string(),
      Self::Text(s) => s.clone(),
      Self::Flag(b) => b.to_string(),
    }
  }
}

// ─── Evidence tiers ──────────────────────────────────────────────────────────

/// Ordinal strength of the documentary support behind a fact.
/// Variant order is the ordering; later is stronger.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTier {
  #[default]
  None,
  SellerStatement,
  ThirdParty,
  OfficialUnsigned,
  OfficialSigned,
  OfficialSignedAndPaid,
  OperatingMeasurement,
}

// ─── Qualitative scales ──────────────────────────────────────────────────────

/// Firmness of a grid connection. Variant order: weaker first.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Firmness {
  NonFirm,
  PartiallyFirm,
  Firm,
}

impl Firmness {
  /// Parse a normalized (lowercase, trimmed) textual fact value.
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
      "firm" => Some(Self::Firm),
      "partially_firm" | "partial" => Some(Self::PartiallyFirm),
      "non_firm" | "nonfirm" | "interruptible" => Some(Self::NonFirm),
      _ => None,
    }
  }
}

/// Degree of land control. Variant order: weaker first.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LandControl {
  None,
  Negotiation,
  Option,
  Leasehold,
  Freehold,
}

impl LandControl {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "freehold" | "ownership" | "owned" => Some(Self::Freehold),
      "leasehold" | "lease" => Some(Self::Leasehold),
      "option" => Some(Self::Option),
      "negotiation" | "loi" => Some(Self::Negotiation),
      "none" => Some(Self::None),
      _ => None,
    }
  }
}

/// Planning / building-permit progress. Variant order: weaker first.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermitLevel {
  None,
  Submitted,
  Granted,
  /// Granted and past the appeal window — legally final.
  GrantedFinal,
}

impl PermitLevel {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
      "granted_final" | "final" | "legally_binding" | "irrevocable" => {
        Some(Self::GrantedFinal)
      }
      "granted" | "approved" => Some(Self::Granted),
      "submitted" | "applied" | "pending" => Some(Self::Submitted),
      "none" | "not_submitted" => Some(Self::None),
      _ => None,
    }
  }
}

// ─── Candidates ──────────────────────────────────────────────────────────────

/// One competing reading of a fact, kept for contradiction reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
  pub value:    Value,
  /// Source name of the snippet the candidate was read from.
  pub source:   String,
  pub citation: SnippetId,
}

// ─── FactValue ───────────────────────────────────────────────────────────────

/// The run's answer for one catalog code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactValue {
  pub code:       String,
  pub value:      Option<Value>,
  pub unit:       Option<String>,
  pub citations:  Vec<SnippetId>,
  pub tier:       EvidenceTier,
  /// Artifact kinds the citations were classified as.
  #[serde(default)]
  pub artifacts:  Vec<ArtifactKind>,
  /// Competing readings, populated when the detector sees more than one.
  #[serde(default)]
  pub candidates: Vec<Candidate>,
}

impl FactValue {
  /// The canonical empty value: null, no citations, tier `None`.
  pub fn empty(code: impl Into<String>) -> Self {
    Self {
      code:       code.into(),
      value:      None,
      unit:       None,
      citations:  Vec::new(),
      tier:       EvidenceTier::None,
      artifacts:  Vec::new(),
      candidates: Vec::new(),
    }
  }

  /// `true` if the fact carries a value backed by at least one citation.
  pub fn is_cited(&self) -> bool {
    self.value.is_some() && !self.citations.is_empty()
  }

  /// Remove citation ids not present in `known`, returning how many were
  /// stripped. If a non-null value loses all citations, the whole fact is
  /// reset to the canonical empty value — an uncited value never survives.
  pub fn strip_unknown_citations(
    &mut self,
    known: &BTreeSet<SnippetId>,
  ) -> usize {
    let before = self.citations.len();
    self.citations.retain(|c| known.contains(c));
    let stripped = before - self.citations.len();

    if self.value.is_some() && self.citations.is_empty() {
      let code = std::mem::take(&mut self.code);
      *self = Self::empty(code);
    }
    stripped
  }

  /// Check the citation-integrity invariant against the run's snippet set.
  pub fn check_integrity(&self, known: &BTreeSet<SnippetId>) -> Result<(), String> {
    if self.value.is_some() && self.citations.is_empty() {
      return Err(format!("fact {:?} has a value but no citations", self.code));
    }
    if self.value.is_none() && !self.citations.is_empty() {
      return Err(format!("fact {:?} has citations but no value", self.code));
    }
    for c in &self.citations {
      if !known.contains(c) {
        return Err(format!(
          "fact {:?} cites unknown snippet {c}",
          self.code
        ));
      }
    }
    Ok(())
  }
}

// ─── Contradictions ──────────────────────────────────────────────────────────

/// How damaging a contradiction is if left unresolved.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Low,
  Medium,
  High,
}

/// Two or more sources disagreeing about one fact beyond tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
  pub fact_code:   String,
  pub severity:    Severity,
  pub description: String,
  /// At least two conflicting candidates.
  pub candidates:  Vec<Candidate>,
}

/// A disagreement that stayed within tolerance — reported, never blocking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionWarning {
  pub fact_code:   String,
  pub description: String,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
