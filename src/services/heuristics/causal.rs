//! Causal ranking of log clusters.
//!
//! A cluster's score combines three terms:
//!
//! - cause weight: fundamental causes outrank the symptoms they produce,
//! - temporal precedence: earlier first-seen outranks later,
//! - volume: log-scaled occurrence count relative to the largest cluster.
//!
//! The weights are chosen so that any fundamental cause scores at least as
//! high as any symptom; precedence and volume order clusters within a class.

use chrono::{DateTime, Utc};

use crate::domain::models::{CauseTag, LogCluster, RootCauseCandidate};

const FUNDAMENTAL_WEIGHT: f64 = 0.7;
const DOWNSTREAM_WEIGHT: f64 = 0.35;
const TIMEOUT_WEIGHT: f64 = 0.3;
const UNKNOWN_WEIGHT: f64 = 0.1;
const PRECEDENCE_WEIGHT: f64 = 0.2;
const VOLUME_WEIGHT: f64 = 0.1;

fn cause_weight(cause: CauseTag) -> f64 {
    if cause.is_fundamental() {
        return FUNDAMENTAL_WEIGHT;
    }
    match cause {
        CauseTag::Timeout => TIMEOUT_WEIGHT,
        CauseTag::Unknown => UNKNOWN_WEIGHT,
        _ => DOWNSTREAM_WEIGHT,
    }
}

fn precedence(first_seen: Option<DateTime<Utc>>, earliest: DateTime<Utc>, latest: DateTime<Utc>) -> f64 {
    let Some(seen) = first_seen else {
        return 0.0;
    };
    let span = (latest - earliest).num_milliseconds();
    if span <= 0 {
        return PRECEDENCE_WEIGHT;
    }
    let lead = (latest - seen).num_milliseconds();
    PRECEDENCE_WEIGHT * lead as f64 / span as f64
}

fn volume(count: usize, max_count: usize) -> f64 {
    if max_count == 0 {
        return 0.0;
    }
    VOLUME_WEIGHT * (1.0 + count as f64).ln() / (1.0 + max_count as f64).ln()
}

/// Rank clusters as root-cause candidates, best first.
///
/// Clusters with an unknown cause and no error-level events are skipped.
/// Ties are broken by earlier first-seen time.
pub fn rank_root_causes(clusters: &[LogCluster]) -> Vec<RootCauseCandidate> {
    let eligible: Vec<&LogCluster> = clusters
        .iter()
        .filter(|c| c.cause != CauseTag::Unknown || c.is_error())
        .collect();
    if eligible.is_empty() {
        return Vec::new();
    }

    let seen: Vec<DateTime<Utc>> = eligible.iter().filter_map(|c| c.first_seen).collect();
    let earliest = seen.iter().min().copied().unwrap_or_else(Utc::now);
    let latest = seen.iter().max().copied().unwrap_or(earliest);
    let max_count = eligible.iter().map(|c| c.count).max().unwrap_or(0);

    let mut candidates: Vec<RootCauseCandidate> = eligible
        .into_iter()
        .map(|cluster| {
            let score = cause_weight(cluster.cause)
                + precedence(cluster.first_seen, earliest, latest)
                + volume(cluster.count, max_count);
            let kind = if cluster.cause.is_fundamental() {
                "fundamental cause"
            } else {
                "symptom"
            };
            let first = cluster
                .first_seen
                .map_or_else(|| "unknown time".to_string(), |t| t.format("%H:%M:%S").to_string());
            RootCauseCandidate {
                rationale: format!(
                    "{} is a {kind}; first seen {first}; {} occurrences",
                    cluster.cause, cluster.count
                ),
                score: score.min(1.0),
                cluster: cluster.clone(),
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| match (a.cluster.first_seen, b.cluster.first_seen) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::LogSeverity;
    use chrono::{Duration, TimeZone};

    fn cluster(cause: CauseTag, first_seen: DateTime<Utc>, count: usize) -> LogCluster {
        LogCluster {
            template_id: format!("{cause}"),
            template: format!("{cause} template"),
            cause,
            count,
            first_seen: Some(first_seen),
            services: vec!["api".to_string()],
            worst_severity: Some(LogSeverity::Error),
        }
    }

    #[test]
    fn test_fundamental_cause_outranks_later_symptom() {
        let incident = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clusters = vec![
            cluster(CauseTag::Timeout, incident - Duration::minutes(5), 500),
            cluster(CauseTag::MemoryPressure, incident - Duration::minutes(10), 5),
        ];

        let ranked = rank_root_causes(&clusters);
        assert_eq!(ranked[0].cluster.cause, CauseTag::MemoryPressure);
        assert_eq!(ranked[1].cluster.cause, CauseTag::Timeout);
        assert!(ranked[0].rationale.contains("fundamental cause"));
    }

    #[test]
    fn test_fundamental_cause_outranks_earlier_symptom() {
        let incident = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clusters = vec![
            cluster(CauseTag::DependencyFailure, incident - Duration::minutes(30), 1000),
            cluster(CauseTag::DiskPressure, incident - Duration::minutes(1), 1),
        ];
        let ranked = rank_root_causes(&clusters);
        assert_eq!(ranked[0].cluster.cause, CauseTag::DiskPressure);
    }

    #[test]
    fn test_earlier_wins_within_same_class() {
        let incident = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clusters = vec![
            cluster(CauseTag::Timeout, incident - Duration::minutes(2), 10),
            cluster(CauseTag::Timeout, incident - Duration::minutes(20), 10),
        ];
        let ranked = rank_root_causes(&clusters);
        assert_eq!(ranked[0].cluster.first_seen, Some(incident - Duration::minutes(20)));
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let now = Utc::now();
        let clusters = vec![
            cluster(CauseTag::MemoryPressure, now, 1),
            cluster(CauseTag::Unknown, now, 3),
        ];
        for candidate in rank_root_causes(&clusters) {
            assert!((0.0..=1.0).contains(&candidate.score));
        }
    }

    #[test]
    fn test_unknown_non_error_clusters_are_skipped() {
        let mut info = cluster(CauseTag::Unknown, Utc::now(), 50);
        info.worst_severity = Some(LogSeverity::Info);
        assert!(rank_root_causes(&[info]).is_empty());
    }
}
