//! Merge request lifecycle
//!
//! Two layers:
//! 1. Status - classify raw host statuses into ready/blocked/pending (pure)
//! 2. Orchestrator - retarget, poll, merge, create-or-reuse (effectful)

mod orchestrator;
mod status;

pub use orchestrator::{Acquisition, BranchPair, LandedMerge, MergeOrchestrator};
