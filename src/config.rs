use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AnalysisError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.md";
pub const DEFAULT_THRESHOLD: u64 = 100;

const PACKET_THRESHOLD_VAR: &str = "SUSPICIOUS_PACKET_THRESHOLD";
const PORT_THRESHOLD_VAR: &str = "PORT_FREQUENCY_THRESHOLD";

/// Detection thresholds. Counts strictly above a threshold are suspicious.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub suspicious_packet_threshold: u64,
    pub port_frequency_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            suspicious_packet_threshold: DEFAULT_THRESHOLD,
            port_frequency_threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    suspicious_packet_threshold: Option<u64>,
    port_frequency_threshold: Option<u64>,
}

impl Config {
    /// Defaults, then the config document, then environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_document(path)?.apply_env())
    }

    /// Reads thresholds from the YAML front matter of `path`.
    ///
    /// A missing file or a document without front matter yields the defaults.
    pub fn from_document(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_front_matter(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config document, using default thresholds");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_front_matter(content: &str) -> Result<Self> {
        let mut config = Self::default();
        let Some(yaml) = front_matter(content) else {
            return Ok(config);
        };
        if yaml.trim().is_empty() {
            return Ok(config);
        }

        let parsed: FrontMatter = serde_yaml::from_str(&yaml)
            .map_err(|e| AnalysisError::Config(format!("invalid front matter: {e}")))?;
        if let Some(value) = parsed.suspicious_packet_threshold {
            config.suspicious_packet_threshold = value;
        }
        if let Some(value) = parsed.port_frequency_threshold {
            config.port_frequency_threshold = value;
        }
        Ok(config)
    }

    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| env::var(key).ok())
    }

    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = threshold_var(&lookup, PACKET_THRESHOLD_VAR) {
            self.suspicious_packet_threshold = value;
        }
        if let Some(value) = threshold_var(&lookup, PORT_THRESHOLD_VAR) {
            self.port_frequency_threshold = value;
        }
        self
    }

    pub fn with_overrides(
        mut self,
        packet_threshold: Option<u64>,
        port_threshold: Option<u64>,
    ) -> Self {
        if let Some(value) = packet_threshold {
            self.suspicious_packet_threshold = value;
        }
        if let Some(value) = port_threshold {
            self.port_frequency_threshold = value;
        }
        self
    }
}

fn threshold_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring non-numeric threshold");
            None
        }
    }
}

/// Text between a leading `---` line and the next `---` line.
///
/// An unterminated block runs to the end of the document.
fn front_matter(content: &str) -> Option<String> {
    let mut lines = content.lines();
    if lines.next()?.trim() != "---" {
        return None;
    }
    let block: Vec<&str> = lines.take_while(|line| line.trim() != "---").collect();
    Some(block.join("\n"))
}
