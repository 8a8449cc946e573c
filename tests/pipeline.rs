use std::collections::BTreeMap;
use std::fs;

use dumpscan::export::{merge_csv, write_json, CSV_EXPORT, JSON_EXPORT};
use dumpscan::report::{write_reports, HTML_REPORT, MARKDOWN_REPORT};
use dumpscan::{analyze_file, AnalysisError, Config, Protocol};

const CAPTURE: &str = "\
tcpdump: verbose output suppressed, use -v[v]... for full protocol decode
listening on eth0, link-type EN10MB (Ethernet), snapshot length 262144 bytes
12:00:00.100000 IP 10.0.0.1.5000 > 10.0.0.2.80: Flags [S], length 40
12:00:00.200000 IP 10.0.0.1.5001 > 10.0.0.2.80: length 60
12:00:01.100000 IP 10.0.0.3.1234 > 10.0.0.2.80: Flags [S], length 40
12:00:01.150000 IP6 fe80::1.546 > ff02::1:2.547: dhcp6 solicit
3 packets captured
";

#[test]
fn test_capture_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("capture.txt");
    fs::write(&capture, CAPTURE).unwrap();

    let config = Config {
        suspicious_packet_threshold: 0,
        port_frequency_threshold: 2,
    };
    let analysis = analyze_file(&capture, config).unwrap();

    assert_eq!(analysis.stats.total_packets, 3);
    assert_eq!(analysis.stats.total_bytes, 140);
    assert_eq!(analysis.stats.protocol_counts.get(&Protocol::Tcp), 2);
    assert_eq!(analysis.stats.protocol_counts.get(&Protocol::Udp), 1);
    assert_eq!(analysis.summary.suspicious_destinations, vec![("10.0.0.2".to_string(), 3)]);
    assert_eq!(analysis.summary.suspicious_destination_ports, vec![(80, 3)]);
    assert!(analysis.summary.suspicious_source_ports.is_empty());

    let received = analysis.series.received_by("10.0.0.2").unwrap();
    assert_eq!(received.buckets, BTreeMap::from([(0, 2), (1, 1)]));
    let sent = analysis.series.sent_by("10.0.0.1").unwrap();
    assert_eq!(sent.buckets, BTreeMap::from([(0, 2)]));

    let written = write_reports(&analysis, dir.path(), true).unwrap();
    assert_eq!(written, vec![dir.path().join(MARKDOWN_REPORT), dir.path().join(HTML_REPORT)]);
    let markdown = fs::read_to_string(dir.path().join(MARKDOWN_REPORT)).unwrap();
    assert!(markdown.contains("| 10.0.0.2 | 3 |"));

    write_json(&analysis.stats.records, &dir.path().join(JSON_EXPORT)).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(JSON_EXPORT)).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[1]["protocol"], "UDP");
    assert_eq!(json[1]["size"], 60);

    let csv_path = dir.path().join(CSV_EXPORT);
    merge_csv(&analysis.stats.records, &csv_path).unwrap();
    let sheet = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(sheet.lines().count(), 3);
    assert!(sheet.lines().next().unwrap().starts_with("12:00:00.100000,10.0.0.1,5000,"));
}

#[test]
fn test_csv_merge_is_repeatable_against_existing_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("capture.txt");
    fs::write(&capture, CAPTURE).unwrap();
    let analysis = analyze_file(&capture, Config::default()).unwrap();

    let csv_path = dir.path().join(CSV_EXPORT);
    let header = "timestamp,source_ip,source_port,destination_ip,destination_port,\
                  protocol,size,flags,verdict\n";
    fs::write(&csv_path, header).unwrap();
    merge_csv(&analysis.stats.records, &csv_path).unwrap();
    let first = fs::read_to_string(&csv_path).unwrap();
    merge_csv(&analysis.stats.records, &csv_path).unwrap();
    let second = fs::read_to_string(&csv_path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.lines().count(), 4);
    assert!(first.lines().next().unwrap().ends_with(",verdict"));
}

#[test]
fn test_noise_only_capture_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("noise.txt");
    fs::write(&capture, "tcpdump: no packets\n\n0 packets captured\n").unwrap();

    let analysis = analyze_file(&capture, Config::default()).unwrap();
    assert_eq!(analysis.stats.total_packets, 0);
    assert!(analysis.summary.top_source_ports.is_empty());
    assert!(analysis.series.sent.is_empty());
}

#[test]
fn test_invalid_utf8_lines_are_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("binary.txt");
    let mut bytes = b"\xff\xfe garbage\n".to_vec();
    let packet = "12:00:00.100000 IP 10.0.0.1.5000 > 10.0.0.2.80: Flags [S], length 40\n";
    bytes.extend_from_slice(packet.as_bytes());
    fs::write(&capture, bytes).unwrap();

    let analysis = analyze_file(&capture, Config::default()).unwrap();
    assert_eq!(analysis.stats.total_packets, 1);
}

#[test]
fn test_missing_capture_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let err = analyze_file(&dir.path().join("absent.txt"), Config::default()).unwrap_err();

    assert!(matches!(err, AnalysisError::InputNotFound { .. }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
