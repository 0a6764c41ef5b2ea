//! The due-diligence analysis engine: retrieval fan-out, fact extraction
//! with citation enforcement, contradiction detection, hard-gate policy
//! evaluation, module scoring, the energization readiness curve, the audit
//! checklist, and contract assembly.
//!
//! External capabilities (retrieval, extraction, market color) enter
//! through the traits in [`retrieval`] and [`extract`]; everything else in
//! this crate is deterministic.

pub mod assemble;
pub mod checklist;
pub mod contradiction;
pub mod energization;
pub mod extract;
pub mod gates;
pub mod patterns;
pub mod pipeline;
pub mod report;
pub mod retrieval;
pub mod scorer;

pub use pipeline::{RunRequest, run_analysis};
