use std::collections::HashMap;
use std::hash::Hash;

use crate::models::domain::{PacketRecord, Protocol};

/// Count per key, iterated in first-seen order.
///
/// Ranking relies on this order to break ties deterministically.
#[derive(Debug, Clone)]
pub struct Counter<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, u64)>,
}

impl<K: Eq + Hash + Clone> Counter<K> {
    pub fn new() -> Self {
        Counter {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Increments `key`, inserting it at zero first if unseen. Returns the new count.
    pub fn increment(&mut self, key: K) -> u64 {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.entries.push((key.clone(), 0));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        self.entries[slot].1 += 1;
        self.entries[slot].1
    }

    pub fn get(&self, key: &K) -> u64 {
        self.index.get(key).map_or(0, |&slot| self.entries[slot].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> + '_ {
        self.entries.iter().map(|(key, count)| (key, *count))
    }

    pub fn entries(&self) -> &[(K, u64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

impl<K: Eq + Hash + Clone> Default for Counter<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Running totals for one pass over a capture.
///
/// Built empty, fed every parsed record in capture order, then only read.
#[derive(Debug, Clone, Default)]
pub struct TrafficStats {
    pub total_packets: usize,
    pub total_bytes: u64,
    pub protocol_counts: Counter<Protocol>,
    pub source_traffic: Counter<String>,
    pub destination_traffic: Counter<String>,
    pub source_ports: Counter<u16>,
    pub destination_ports: Counter<u16>,
    pub records: Vec<PacketRecord>,
}

impl TrafficStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: PacketRecord) {
        self.total_packets += 1;
        self.total_bytes = self.total_bytes.saturating_add(record.size);
        self.protocol_counts.increment(record.protocol);
        self.source_traffic.increment(record.source_ip.clone());
        self.destination_traffic.increment(record.destination_ip.clone());
        if let Some(port) = record.source_port {
            self.source_ports.increment(port);
        }
        if let Some(port) = record.destination_port {
            self.destination_ports.increment(port);
        }
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Extend<PacketRecord> for TrafficStats {
    fn extend<I: IntoIterator<Item = PacketRecord>>(&mut self, iter: I) {
        for record in iter {
            self.update(record);
        }
    }
}
