use std::fmt;
use std::hash::Hash;

use serde::Serialize;

use crate::config::Config;
use crate::stats::{Counter, TrafficStats};

pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityType {
    HighVolumeSource,
    HighVolumeDestination,
    FrequentSourcePort,
    FrequentDestinationPort,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::HighVolumeSource => write!(f, "High Volume Source"),
            ActivityType::HighVolumeDestination => write!(f, "High Volume Destination"),
            ActivityType::FrequentSourcePort => write!(f, "Frequent Source Port"),
            ActivityType::FrequentDestinationPort => write!(f, "Frequent Destination Port"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspiciousActivity {
    pub activity_type: ActivityType,
    pub source: String,
    pub count: u64,
    pub threshold: u64,
}

/// Rankings and suspicious sets derived from frozen counters.
///
/// Address top-10 lists are ranked after thresholding; the destination volume
/// and port top-10 tables are ranked over the full counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionSummary {
    pub top_destinations: Vec<(String, u64)>,
    pub top_source_ports: Vec<(u16, u64)>,
    pub top_destination_ports: Vec<(u16, u64)>,
    pub suspicious_sources: Vec<(String, u64)>,
    pub suspicious_destinations: Vec<(String, u64)>,
    pub suspicious_source_ports: Vec<(u16, u64)>,
    pub suspicious_destination_ports: Vec<(u16, u64)>,
    pub top_suspicious_sources: Vec<(String, u64)>,
    pub top_suspicious_destinations: Vec<(String, u64)>,
}

impl DetectionSummary {
    pub fn top_suspicious_source_addresses(&self) -> Vec<String> {
        self.top_suspicious_sources.iter().map(|(addr, _)| addr.clone()).collect()
    }

    pub fn top_suspicious_destination_addresses(&self) -> Vec<String> {
        self.top_suspicious_destinations.iter().map(|(addr, _)| addr.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrafficAnalyzer {
    config: Config,
}

impl TrafficAnalyzer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn summarize(&self, stats: &TrafficStats) -> DetectionSummary {
        let packets = self.config.suspicious_packet_threshold;
        let ports = self.config.port_frequency_threshold;

        let suspicious_sources = over_threshold(&stats.source_traffic, packets);
        let suspicious_destinations = over_threshold(&stats.destination_traffic, packets);

        DetectionSummary {
            top_destinations: top_n(&stats.destination_traffic, TOP_N),
            top_source_ports: top_n(&stats.source_ports, TOP_N),
            top_destination_ports: top_n(&stats.destination_ports, TOP_N),
            top_suspicious_sources: rank(suspicious_sources.clone(), TOP_N),
            top_suspicious_destinations: rank(suspicious_destinations.clone(), TOP_N),
            suspicious_sources,
            suspicious_destinations,
            suspicious_source_ports: over_threshold(&stats.source_ports, ports),
            suspicious_destination_ports: over_threshold(&stats.destination_ports, ports),
        }
    }

    /// Every suspicious entity as a flat list, busiest first within each kind.
    pub fn detect_suspicious_traffic(&self, summary: &DetectionSummary) -> Vec<SuspiciousActivity> {
        let packets = self.config.suspicious_packet_threshold;
        let ports = self.config.port_frequency_threshold;

        let mut suspicious_activities = Vec::new();
        collect(
            &mut suspicious_activities,
            ActivityType::HighVolumeSource,
            &summary.suspicious_sources,
            packets,
        );
        collect(
            &mut suspicious_activities,
            ActivityType::HighVolumeDestination,
            &summary.suspicious_destinations,
            packets,
        );
        collect(
            &mut suspicious_activities,
            ActivityType::FrequentSourcePort,
            &summary.suspicious_source_ports,
            ports,
        );
        collect(
            &mut suspicious_activities,
            ActivityType::FrequentDestinationPort,
            &summary.suspicious_destination_ports,
            ports,
        );
        suspicious_activities
    }
}

fn collect<K: ToString + Clone>(
    out: &mut Vec<SuspiciousActivity>,
    activity_type: ActivityType,
    entries: &[(K, u64)],
    threshold: u64,
) {
    let ranked = rank(entries.to_vec(), entries.len());
    out.extend(ranked.into_iter().map(|(key, count)| SuspiciousActivity {
        activity_type,
        source: key.to_string(),
        count,
        threshold,
    }));
}

/// Sorts by count descending, keeping input order among equal counts, and
/// keeps the first `n`.
pub fn rank<K>(mut entries: Vec<(K, u64)>, n: usize) -> Vec<(K, u64)> {
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(n);
    entries
}

/// The `n` busiest keys; ties go to the key seen first.
pub fn top_n<K: Eq + Hash + Clone>(counter: &Counter<K>, n: usize) -> Vec<(K, u64)> {
    rank(counter.entries().to_vec(), n)
}

/// Entries whose count is strictly greater than `threshold`, in first-seen order.
pub fn over_threshold<K: Eq + Hash + Clone>(counter: &Counter<K>, threshold: u64) -> Vec<(K, u64)> {
    counter
        .iter()
        .filter(|&(_, count)| count > threshold)
        .map(|(key, count)| (key.clone(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(entries: &[(&str, u64)]) -> Counter<String> {
        let mut counter = Counter::new();
        for (key, count) in entries {
            for _ in 0..*count {
                counter.increment(key.to_string());
            }
        }
        counter
    }

    #[test]
    fn test_top_n_orders_by_count_with_stable_ties() {
        let counter = counter(&[("a", 2), ("b", 5), ("c", 2), ("d", 1)]);
        let top = top_n(&counter, 3);
        assert_eq!(
            top,
            vec![("b".to_string(), 5), ("a".to_string(), 2), ("c".to_string(), 2)]
        );
    }

    #[test]
    fn test_top_n_length_and_dominance() {
        let counter = counter(&[("a", 3), ("b", 1), ("c", 4), ("d", 1), ("e", 9), ("f", 2)]);
        for n in 0..8 {
            let top = top_n(&counter, n);
            assert_eq!(top.len(), n.min(counter.len()));
            assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));

            let min_kept = top.iter().map(|(_, c)| *c).min().unwrap_or(u64::MAX);
            for (key, count) in counter.iter() {
                if !top.iter().any(|(k, _)| k == key) {
                    assert!(count <= min_kept);
                }
            }
        }
    }

    #[test]
    fn test_over_threshold_is_strict() {
        let counter = counter(&[("a", 100), ("b", 101), ("c", 50), ("d", 250)]);
        let suspicious = over_threshold(&counter, 100);
        assert_eq!(suspicious, vec![("b".to_string(), 101), ("d".to_string(), 250)]);

        for (key, count) in counter.iter() {
            let flagged = suspicious.iter().any(|(k, _)| k == key);
            assert_eq!(flagged, count > 100);
        }
    }

    #[test]
    fn test_address_ranking_applies_after_threshold() {
        let mut stats = TrafficStats::new();
        stats.destination_traffic = counter(&[("quiet", 3), ("busy", 8)]);
        stats.source_traffic = counter(&[("s1", 6), ("s2", 2)]);

        let config = Config {
            suspicious_packet_threshold: 5,
            port_frequency_threshold: 5,
        };
        let summary = TrafficAnalyzer::new(config).summarize(&stats);

        assert_eq!(summary.top_destinations.len(), 2);
        assert_eq!(summary.top_suspicious_destinations, vec![("busy".to_string(), 8)]);
        assert_eq!(summary.top_suspicious_source_addresses(), vec!["s1".to_string()]);
        for entry in &summary.top_suspicious_destinations {
            assert!(summary.suspicious_destinations.contains(entry));
        }
    }

    #[test]
    fn test_suspicious_activity_listing() {
        let mut stats = TrafficStats::new();
        stats.source_traffic = counter(&[("10.0.0.9", 4), ("10.0.0.7", 9)]);
        let mut ports = Counter::new();
        for _ in 0..3 {
            ports.increment(4444u16);
        }
        stats.destination_ports = ports;

        let analyzer = TrafficAnalyzer::new(Config {
            suspicious_packet_threshold: 2,
            port_frequency_threshold: 2,
        });
        let activities = analyzer.detect_suspicious_traffic(&analyzer.summarize(&stats));

        assert_eq!(activities.len(), 3);
        assert_eq!(activities[0].activity_type, ActivityType::HighVolumeSource);
        assert_eq!(activities[0].source, "10.0.0.7");
        assert_eq!(activities[2].activity_type, ActivityType::FrequentDestinationPort);
        assert_eq!(activities[2].source, "4444");
    }

    #[test]
    fn test_empty_stats_give_empty_summary() {
        let summary = TrafficAnalyzer::default().summarize(&TrafficStats::new());
        assert_eq!(summary, DetectionSummary::default());
    }
}
