// Turns tcpdump text lines into packet records.
//
// Only IPv4 "IP" lines are understood. Anything else (banners, IP6, ARP)
// is dropped without a diagnostic.

use std::net::Ipv4Addr;

use chrono::NaiveTime;
use regex::Regex;
use tracing::debug;

use crate::models::domain::{PacketRecord, Protocol};

/// Substring tcpdump prints for TCP flag annotations.
///
/// Protocol detection is a text heuristic: a UDP line whose rendering
/// happens to contain this marker is reported as TCP.
const TCP_FLAGS_MARKER: &str = "Flags";

pub struct LineParser {
    packet_line: Regex,
    header: Regex,
    length_field: Regex,
    paren_length: Regex,
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            packet_line: Regex::new(r"^\d{2}:\d{2}:\d{2}\.\d+\s+IP")
                .expect("valid packet line pattern"),
            header: Regex::new(r"^(\d{2}:\d{2}:\d{2}\.\d+)\s+IP\s+([^\s>]+)\s+>\s+([^\s:]+):")
                .expect("valid header pattern"),
            length_field: Regex::new(r"length\s+(\d+)").expect("valid length pattern"),
            paren_length: Regex::new(r"\((\d+)\)").expect("valid parenthesized length pattern"),
        }
    }

    /// True when the line starts with `HH:MM:SS.frac` followed by the `IP` marker.
    pub fn is_packet_line(&self, line: &str) -> bool {
        self.packet_line.is_match(line)
    }

    /// Classifies and parses in one step.
    pub fn parse_line(&self, line: &str) -> Option<PacketRecord> {
        if !self.is_packet_line(line) {
            return None;
        }
        let record = self.parse_packet(line);
        if record.is_none() {
            debug!(line, "skipping unparseable packet line");
        }
        record
    }

    /// Extracts a record from a line the classifier already accepted.
    ///
    /// Returns `None` when the header does not match or the timestamp is not a
    /// valid time of day; a record is never built from partial fields.
    pub fn parse_packet(&self, line: &str) -> Option<PacketRecord> {
        let caps = self.header.captures(line)?;
        let timestamp = parse_timestamp(caps.get(1)?.as_str())?;
        let (source_ip, source_port) = split_endpoint(caps.get(2)?.as_str());
        let (destination_ip, destination_port) = split_endpoint(caps.get(3)?.as_str());

        Some(PacketRecord {
            timestamp,
            source_ip,
            source_port,
            destination_ip,
            destination_port,
            protocol: detect_protocol(line),
            size: self.extract_size(line),
        })
    }

    /// `length N` wins over `(N)`; neither present means 0.
    pub fn extract_size(&self, line: &str) -> u64 {
        first_number(&self.length_field, line)
            .or_else(|| first_number(&self.paren_length, line))
            .unwrap_or(0)
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

fn first_number(pattern: &Regex, line: &str) -> Option<u64> {
    pattern.captures(line)?.get(1)?.as_str().parse().ok()
}

pub fn detect_protocol(line: &str) -> Protocol {
    if line.contains(TCP_FLAGS_MARKER) {
        Protocol::Tcp
    } else {
        Protocol::Udp
    }
}

/// Accepts any number of fractional digits; chrono keeps nanosecond precision.
pub fn parse_timestamp(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f").ok()
}

/// Splits `a.b.c.d.port` into address and port.
///
/// The last dot-separated component is the port when it is all digits and fits
/// in a `u16`; otherwise the whole token is the address. A numeric component
/// above 65535 is therefore kept as part of the address instead of becoming a
/// port (`"10.0.0.5.99999"` has no port). A token that is already a complete
/// IPv4 address carries no port. A bare number such as `"443"` yields an empty
/// address with port 443.
pub fn split_endpoint(token: &str) -> (String, Option<u16>) {
    if token.parse::<Ipv4Addr>().is_ok() {
        return (token.to_string(), None);
    }

    let (address, last) = match token.rsplit_once('.') {
        Some((address, last)) => (address, last),
        None => ("", token),
    };

    let is_numeric = !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit());
    match is_numeric.then(|| last.parse::<u16>().ok()).flatten() {
        Some(port) => (address.to_string(), Some(port)),
        None => (token.to_string(), None),
    }
}
