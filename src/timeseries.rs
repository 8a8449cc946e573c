use std::collections::{BTreeMap, HashMap};

use chrono::NaiveTime;

use crate::models::domain::PacketRecord;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Packets per whole second since the first record, for one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSeries {
    pub address: String,
    pub buckets: BTreeMap<i64, u64>,
}

impl AddressSeries {
    fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            buckets: BTreeMap::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.buckets.values().sum()
    }
}

/// Send-side and receive-side series, one entry per tracked address in the
/// order the addresses were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficSeries {
    pub sent: Vec<AddressSeries>,
    pub received: Vec<AddressSeries>,
}

impl TrafficSeries {
    pub fn sent_by(&self, address: &str) -> Option<&AddressSeries> {
        self.sent.iter().find(|series| series.address == address)
    }

    pub fn received_by(&self, address: &str) -> Option<&AddressSeries> {
        self.received.iter().find(|series| series.address == address)
    }
}

/// Whole seconds from `start` to `at`, rounded down.
pub fn second_offset(start: NaiveTime, at: NaiveTime) -> i64 {
    // Two times of day are less than a day apart, so this never overflows.
    let nanos = at.signed_duration_since(start).num_nanoseconds().unwrap_or(0);
    nanos.div_euclid(NANOS_PER_SECOND)
}

/// Bins every record into per-second buckets for the tracked sources and
/// destinations. The reference time is the first record's timestamp; with no
/// records every series stays empty.
pub fn bin_by_second(
    records: &[PacketRecord],
    sources: &[String],
    destinations: &[String],
) -> TrafficSeries {
    let mut series = TrafficSeries {
        sent: sources.iter().map(|addr| AddressSeries::new(addr)).collect(),
        received: destinations.iter().map(|addr| AddressSeries::new(addr)).collect(),
    };

    let Some(start) = records.first().map(|record| record.timestamp) else {
        return series;
    };

    let sent_index = index_of(&series.sent);
    let received_index = index_of(&series.received);

    for record in records {
        let offset = second_offset(start, record.timestamp);
        if let Some(&slot) = sent_index.get(record.source_ip.as_str()) {
            *series.sent[slot].buckets.entry(offset).or_insert(0) += 1;
        }
        if let Some(&slot) = received_index.get(record.destination_ip.as_str()) {
            *series.received[slot].buckets.entry(offset).or_insert(0) += 1;
        }
    }
    series
}

fn index_of(series: &[AddressSeries]) -> HashMap<String, usize> {
    series
        .iter()
        .enumerate()
        .map(|(slot, s)| (s.address.clone(), slot))
        .collect()
}
