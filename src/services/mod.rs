//! Services layer: the investigation and correlation logic that sits between
//! the domain models and the orchestrating application layer.

pub mod change_correlator;
pub mod cluster_cache;
pub mod heuristics;
pub mod log_clustering;
pub mod pattern_registry;
pub mod query_corrector;
pub mod remediation;
pub mod strategies;
pub mod time_range;

pub use change_correlator::ChangeCorrelator;
pub use cluster_cache::{CacheStats, ClusterCache};
pub use heuristics::{HeuristicEngine, HeuristicOutcome};
pub use log_clustering::LogClusterer;
pub use pattern_registry::{PatternRegistry, PatternTables};
pub use query_corrector::{correct_query, CorrectedQuery};
pub use strategies::{strategy_for, QueryStrategy};
pub use time_range::{parse_incident_time, parse_time_range};
