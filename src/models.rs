pub mod domain {
    use std::fmt;

    use chrono::NaiveTime;
    use serde::Serialize;

    /// Transport classification derived from the capture line text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum Protocol {
        Tcp,
        Udp,
    }

    impl fmt::Display for Protocol {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Protocol::Tcp => write!(f, "TCP"),
                Protocol::Udp => write!(f, "UDP"),
            }
        }
    }

    /// One packet event recovered from a capture line.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PacketRecord {
        pub timestamp: NaiveTime,
        pub source_ip: String,
        pub source_port: Option<u16>,
        pub destination_ip: String,
        pub destination_port: Option<u16>,
        pub protocol: Protocol,
        pub size: u64,
    }
}

pub mod dto {
    use serde::Serialize;

    use super::domain::{PacketRecord, Protocol};

    pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.6f";

    #[derive(Debug, Serialize, Clone, PartialEq, Eq)]
    pub struct PacketRecordDTO {
        pub timestamp: String,
        pub source_ip: String,
        pub source_port: Option<u16>,
        pub destination_ip: String,
        pub destination_port: Option<u16>,
        pub protocol: Protocol,
        pub size: u64,
    }

    impl From<&PacketRecord> for PacketRecordDTO {
        fn from(record: &PacketRecord) -> Self {
            PacketRecordDTO {
                timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                source_ip: record.source_ip.clone(),
                source_port: record.source_port,
                destination_ip: record.destination_ip.clone(),
                destination_port: record.destination_port,
                protocol: record.protocol,
                size: record.size,
            }
        }
    }

}
