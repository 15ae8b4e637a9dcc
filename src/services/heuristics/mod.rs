//! Heuristic pattern detectors and causal ranking.
//!
//! Detectors are independent and stateless: each inspects the findings and
//! raw events of an investigation and, when its signature is present, returns
//! follow-up actions together with the standard procedure that covers the
//! situation. The [`HeuristicEngine`] runs every registered detector and
//! merges their output.
//!
//! ## Built-in detectors
//!
//! | Detector            | Signature                                  |
//! |---------------------|--------------------------------------------|
//! | `timeout`           | timeouts, deadline exceeded, 504s          |
//! | `memory_pressure`   | OOM kills, heap exhaustion                 |
//! | `auth_failure`      | 401/403, invalid or expired tokens         |
//! | `database_contention` | deadlocks, lock waits, pool saturation   |
//! | `rate_limiting`     | 429s, throttling                           |
//! | `disk_pressure`     | full volumes, inode exhaustion             |
//!
//! Additional detectors are added with [`HeuristicEngine::register`].

pub mod causal;
pub mod detectors;

pub use causal::rank_root_causes;
pub use detectors::{
    AuthFailureDetector, DatabaseContentionDetector, DiskPressureDetector,
    MemoryPressureDetector, RateLimitingDetector, TimeoutDetector,
};

use tracing::debug;

use crate::domain::models::{dedupe_and_rank, Finding, LogEvent, NextAction, StandardProcedure};

/// Output of a detector whose signature matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub detector: &'static str,
    pub actions: Vec<NextAction>,
    pub procedure: StandardProcedure,
}

/// A stateless signature matcher.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, findings: &[Finding], events: &[LogEvent]) -> Option<Detection>;
}

/// Merged output of all detectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeuristicOutcome {
    pub actions: Vec<NextAction>,
    pub procedures: Vec<StandardProcedure>,
    pub matched: Vec<&'static str>,
}

/// Runs registered detectors over an investigation's findings and events.
pub struct HeuristicEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for HeuristicEngine {
    fn default() -> Self {
        Self::with_builtin_detectors()
    }
}

impl HeuristicEngine {
    /// Engine with no detectors.
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    pub fn with_builtin_detectors() -> Self {
        let mut engine = Self::new();
        engine.register(Box::new(TimeoutDetector));
        engine.register(Box::new(MemoryPressureDetector));
        engine.register(Box::new(AuthFailureDetector));
        engine.register(Box::new(DatabaseContentionDetector));
        engine.register(Box::new(RateLimitingDetector));
        engine.register(Box::new(DiskPressureDetector));
        engine
    }

    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run every detector. Actions come back deduplicated and ranked; each
    /// procedure appears once.
    pub fn run(&self, findings: &[Finding], events: &[LogEvent]) -> HeuristicOutcome {
        let mut outcome = HeuristicOutcome::default();

        for detector in &self.detectors {
            let Some(detection) = detector.detect(findings, events) else {
                continue;
            };
            debug!(
                detector = detection.detector,
                actions = detection.actions.len(),
                procedure = %detection.procedure.id,
                "Detector matched"
            );
            outcome.matched.push(detection.detector);
            outcome.actions.extend(detection.actions);
            if !outcome.procedures.iter().any(|p| p.id == detection.procedure.id) {
                outcome.procedures.push(detection.procedure);
            }
        }

        outcome.actions = dedupe_and_rank(outcome.actions);
        outcome
    }
}

/// Merge strategy actions with heuristic actions. Strategy actions come first
/// so they win description ties.
pub fn merge_actions(strategy: Vec<NextAction>, heuristic: Vec<NextAction>) -> Vec<NextAction> {
    let mut merged = strategy;
    merged.extend(heuristic);
    dedupe_and_rank(merged)
}
